/// Column names used by the cleaning pipeline and the reporting aggregates.
/// Source headers must match these exactly once the schema stage has trimmed them.

// Source columns
pub const GRANT_REQ_DATE: &str = "Grant Req Date";
pub const PAYMENT_SUBMITTED: &str = "Payment Submitted?";
pub const AMOUNT: &str = "Amount";
pub const REMAINING_BALANCE: &str = "Remaining Balance";
pub const GENDER: &str = "Gender";
pub const INSURANCE_TYPE: &str = "Insurance Type";
pub const PT_CITY: &str = "Pt City";
pub const PT_STATE: &str = "Pt State";
pub const MONTHLY_INCOME: &str = "Total Household Gross Monthly Income";
pub const DOB: &str = "DOB";
pub const APPLICATION_SIGNED: &str = "Application Signed?";

// Derived columns
pub const DAYS_TO_SUPPORT: &str = "Days to Support";
pub const AGE: &str = "Age";
pub const INCOME_RANGE: &str = "Income Range";

/// Label used when insurance type is absent
pub const UNKNOWN_INSURANCE: &str = "Unknown";

/// Label used when income is absent or unusable
pub const MISSING_BRACKET: &str = "Missing";

/// Columns the pipeline and reports expect to find in the source
pub fn expected_columns() -> Vec<&'static str> {
    vec![
        GRANT_REQ_DATE,
        PAYMENT_SUBMITTED,
        AMOUNT,
        REMAINING_BALANCE,
        GENDER,
        INSURANCE_TYPE,
        PT_CITY,
        PT_STATE,
        MONTHLY_INCOME,
        DOB,
        APPLICATION_SIGNED,
    ]
}

/// Columns coerced to currency amounts
pub fn amount_columns() -> Vec<&'static str> {
    vec![AMOUNT, REMAINING_BALANCE, MONTHLY_INCOME]
}
