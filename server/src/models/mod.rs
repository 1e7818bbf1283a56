//! Rows of the relational store and the small value types around them.

pub mod account;
pub mod asset;
pub mod cart;
pub mod catalog;
pub mod home;
pub mod order;
pub mod payment;
pub mod review;
pub mod user;

pub use account::Address;
pub use asset::{Asset, AssetKind};
pub use cart::{Cart, CartLine, PurchaseKind};
pub use catalog::ProductListing;
pub use home::{Boundary, DigitalHome, LinkRelation, OwnedItem, OwnedItemDetail, Transform};
pub use order::{Order, OrderItem, OrderStatus};
pub use payment::{BankAccount, CreditCard};
pub use review::Review;
pub use user::{CustomerProfile, Role, Session, User};
