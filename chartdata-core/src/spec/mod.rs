pub mod builders;
pub mod equality;
pub mod function;
pub mod property;
