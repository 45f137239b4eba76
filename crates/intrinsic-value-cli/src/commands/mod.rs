pub mod discount;
pub mod multiples;
pub mod valuation;
