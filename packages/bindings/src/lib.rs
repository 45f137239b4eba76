use napi::Result as NapiResult;
use napi_derive::napi;
use rust_decimal::Decimal;
use serde::Deserialize;

use intrinsic_value_core::valuation::{dcf, multiples, recommendation, report, request, wacc};

/// Convert any Display error into a napi::Error.
fn to_napi_error(e: impl std::fmt::Display) -> napi::Error {
    napi::Error::from_reason(e.to_string())
}

// ---------------------------------------------------------------------------
// Valuation
// ---------------------------------------------------------------------------

/// Engine-level DCF over fully resolved inputs.
#[napi]
pub fn compute_dcf(input_json: String) -> NapiResult<String> {
    let input: dcf::ValuationInputs = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = dcf::compute(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

/// Full request: share count and discount rate resolution, warnings and an
/// optional recommendation.
#[napi]
pub fn value_stock(input_json: String) -> NapiResult<String> {
    let input: request::ValuationRequest =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = request::value_stock(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[derive(Deserialize)]
struct RecommendInput {
    intrinsic_value_per_share: Decimal,
    current_price: Decimal,
}

#[napi]
pub fn recommend(input_json: String) -> NapiResult<String> {
    let input: RecommendInput = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output =
        recommendation::recommend_from_value(input.intrinsic_value_per_share, input.current_price);
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn pe_valuation(input_json: String) -> NapiResult<String> {
    let input: multiples::PeValuationInput =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = multiples::pe_valuation(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn pb_valuation(input_json: String) -> NapiResult<String> {
    let input: multiples::PbValuationInput =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = multiples::pb_valuation(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Discount rate
// ---------------------------------------------------------------------------

#[napi]
pub fn calculate_wacc(input_json: String) -> NapiResult<String> {
    let input: wacc::WaccInput = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = wacc::calculate_wacc(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Reporting
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct ReportInput {
    request: request::ValuationRequest,
    #[serde(default)]
    unit_label: Option<String>,
}

/// Value the request and return the markdown report.
#[napi]
pub fn render_report(input_json: String) -> NapiResult<String> {
    let input: ReportInput = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let prepared = input.request.prepare().map_err(to_napi_error)?;
    let output = request::value_stock(&input.request).map_err(to_napi_error)?;
    let meta = report::ReportMeta {
        company: input.request.company.clone(),
        as_of: input.request.as_of,
        unit_label: input.unit_label,
    };
    Ok(report::render_markdown(&output.result, &prepared.inputs, &meta))
}
