//! Store services: cart resolution and mutation, checkout, identity hooks,
//! catalog, customer profiles, favorites and reviews.

pub mod carts;
pub mod catalog;
pub mod checkout;
pub mod customers;
pub mod favorites;
pub mod identity;
pub mod reviews;
