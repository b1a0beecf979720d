//! Data models for dashboard entities.
//!
//! This module contains the data structures returned by the backend:
//!
//! - `User`: people records with address and company info
//! - `Product`: catalog items with pricing and stock
//! - `Category`: product category catalog entries
//! - `Page`: one page of a listing plus the total match count

pub mod category;
pub mod page;
pub mod product;
pub mod user;

pub use category::Category;
pub use page::Page;
pub use product::{Dimensions, Product};
pub use user::{Address, Company, User};
