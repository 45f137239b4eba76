//! Discounted cash flow valuation: projection, discounting, the equity bridge,
//! per-share value and the buy/hold/avoid signal derived from it. P/E and P/B
//! multiples give a cross-check against the same signal.

pub mod dcf;
pub mod multiples;
pub mod recommendation;
pub mod request;
pub mod wacc;

#[cfg(feature = "report")]
pub mod report;

pub use dcf::{compute, GrowthStage, ValuationInputs, ValuationResult};
pub use multiples::{pb_valuation, pe_valuation, MultipleMethod, MultipleValuationOutput};
pub use recommendation::{recommend, Confidence, Recommendation, RecommendationOutput};
pub use request::{summarize, value_stock, ShareCount, ValuationRequest, ValuationSummary};
