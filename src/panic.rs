//! Rendering of panic payloads for error responses and logs.

use std::{any::Any, fmt};

/// Display adapter over a caught panic payload.
///
/// `String` and `&'static str` payloads print as their text; anything else
/// falls back to the payload's `Debug` form.
///
/// ```
/// use wirecall::panic::PanicMessage;
///
/// let caught = std::panic::catch_unwind(|| {
///     panic!("boom");
/// }).expect_err("closure panics");
/// assert_eq!(PanicMessage::new(&*caught).to_string(), "boom");
/// ```
#[derive(Clone, Copy)]
pub struct PanicMessage<'a>(&'a (dyn Any + Send));

impl<'a> PanicMessage<'a> {
    /// Borrow a payload returned by `catch_unwind`.
    #[must_use]
    pub fn new(payload: &'a (dyn Any + Send)) -> Self { Self(payload) }
}

impl fmt::Display for PanicMessage<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(s) = self.0.downcast_ref::<String>() {
            f.write_str(s)
        } else if let Some(s) = self.0.downcast_ref::<&'static str>() {
            f.write_str(s)
        } else {
            write!(f, "{:?}", self.0)
        }
    }
}

impl fmt::Debug for PanicMessage<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("PanicMessage").field(&self.to_string()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::PanicMessage;

    #[test]
    fn formatted_payloads_are_rendered() {
        let caught = std::panic::catch_unwind(|| {
            panic!("index {} out of range", 3);
        })
        .expect_err("closure panics");
        assert_eq!(PanicMessage::new(&*caught).to_string(), "index 3 out of range");
    }

    #[test]
    fn opaque_payloads_fall_back_to_debug() {
        let caught = std::panic::catch_unwind(|| {
            std::panic::panic_any(5_u32);
        })
        .expect_err("closure panics");
        assert!(PanicMessage::new(&*caught).to_string().contains("Any"));
    }
}
