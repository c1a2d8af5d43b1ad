//! Power control interface

/// Power control collaborator.
pub trait PowerControl: Send + Sync {
    /// Power off the machine.
    ///
    /// On real hardware this does not return. Host implementations may
    /// return, after which the gateway treats the calling process as gone.
    fn power_off(&self);
}
