//! Navigation seam used by the cart summary.

/// Screen identifier of the full cart screen.
pub const CART_SCREEN: &str = "Cart";

/// Moves the client to a named screen.
pub trait Navigator {
    fn navigate(&self, screen: &str);
}

