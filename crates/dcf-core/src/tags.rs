//! Standardized financial data tags.
//!
//! Tag names follow the Intrinio data tag catalogue and are used both as
//! statement record keys and as historical data identifiers.

/// Net income, read from the cash flow statement.
pub const NET_INCOME: &str = "netincome";

/// Net cash from continuing operating activities.
pub const OPERATING_CASH_FLOW: &str = "netcashfromcontinuingoperatingactivities";

/// Purchase of plant, property and equipment. Reported as a negative value.
pub const CAPITAL_EXPENDITURE: &str = "purchaseofplantpropertyandequipment";

/// Total revenue, read from the income statement.
pub const TOTAL_REVENUE: &str = "totalrevenue";

/// Weighted average diluted shares outstanding.
pub const DILUTED_SHARES_OUTSTANDING: &str = "weightedavedilutedsharesos";

/// Diluted EPS adjusted for stock splits.
pub const ADJUSTED_DILUTED_EPS: &str = "adjdilutedeps";

/// Book value per share.
pub const BOOK_VALUE_PER_SHARE: &str = "bookvaluepershare";
