pub mod destinations;
pub mod packages;
pub mod query;
pub mod slug;
pub mod testimonials;
