//! Data models for Booksync

mod booking;

pub use booking::{Booking, StoredBooking};
