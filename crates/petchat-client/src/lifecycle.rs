//! Scoped connection ownership.
//!
//! A screen that shows a room connects when it appears and must disconnect
//! when it goes away, on every exit path. [`Mounted`] ties the disconnect to
//! a guard's drop.

use std::ops::{Deref, DerefMut};

/// A client that can be torn down.
pub trait Disconnect {
    /// Close the connection and forget the target.
    fn disconnect(&mut self);
}

/// Borrow of a connected client that disconnects it on drop.
///
/// Derefs to the client so it can be used normally while mounted.
#[must_use = "dropping the guard disconnects immediately"]
pub struct Mounted<'a, S: Disconnect> {
    socket: &'a mut S,
}

impl<'a, S: Disconnect> Mounted<'a, S> {
    /// Guard an already connected client.
    pub fn new(socket: &'a mut S) -> Self {
        Self { socket }
    }
}

impl<S: Disconnect> Deref for Mounted<'_, S> {
    type Target = S;

    fn deref(&self) -> &S {
        self.socket
    }
}

impl<S: Disconnect> DerefMut for Mounted<'_, S> {
    fn deref_mut(&mut self) -> &mut S {
        self.socket
    }
}

impl<S: Disconnect> Drop for Mounted<'_, S> {
    fn drop(&mut self) {
        self.socket.disconnect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Probe {
        disconnects: usize,
    }

    impl Disconnect for Probe {
        fn disconnect(&mut self) {
            self.disconnects += 1;
        }
    }

    #[test]
    fn drop_disconnects_once() {
        let mut probe = Probe::default();
        {
            let _guard = Mounted::new(&mut probe);
        }
        assert_eq!(probe.disconnects, 1);
    }

    #[test]
    fn early_return_still_disconnects() {
        fn screen(probe: &mut Probe, fail: bool) -> Result<(), &'static str> {
            let _guard = Mounted::new(probe);
            if fail {
                return Err("render failed");
            }
            Ok(())
        }

        let mut probe = Probe::default();
        assert!(screen(&mut probe, true).is_err());
        assert!(screen(&mut probe, false).is_ok());
        assert_eq!(probe.disconnects, 2);
    }
}
