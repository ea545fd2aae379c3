//! Per-statement definitions: requested line items, cleaned whitelist, and
//! artifact names.

use super::table::SaveMode;
use super::EtlError;
use polars::prelude::DataFrame;

/// Static description of one statement kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatementSchema {
    /// Artifact stem, e.g. `income_statement`.
    pub name: &'static str,
    /// Line items requested from the provider.
    pub line_items: &'static [&'static str],
    /// Columns kept by transform, in output order.
    pub columns: &'static [&'static str],
}

impl StatementSchema {
    /// Raw extract file name: `<name>.csv`.
    pub fn raw_file_name(&self) -> String {
        format!("{}.csv", self.name)
    }

    /// Staging object key: `STAGING/<name>.csv`.
    pub fn staging_key(&self) -> String {
        format!("STAGING/{}.csv", self.name)
    }

    /// Warehouse object key: `to_warehouse/<name>_cleaned.<ext>`.
    pub fn warehouse_key(&self, mode: SaveMode) -> String {
        format!("to_warehouse/{}_cleaned.{}", self.name, mode.extension())
    }

    /// First whitelisted column missing from `df`.
    pub fn validate(&self, df: &DataFrame) -> Result<(), EtlError> {
        match self
            .columns
            .iter()
            .find(|c| df.get_column_index(c).is_none())
        {
            Some(column) => Err(EtlError::SchemaMismatch {
                column: column.to_string(),
            }),
            None => Ok(()),
        }
    }
}

/// Quarterly income statement.
pub const INCOME_STATEMENT: StatementSchema = StatementSchema {
    name: "income_statement",
    line_items: INCOME_STATEMENT_ITEMS,
    columns: INCOME_STATEMENT_COLUMNS,
};

const INCOME_STATEMENT_COLUMNS: &[&str] = &[
    "symbol",
    "date",
    "TotalRevenue",
    "SpecialIncomeCharges",
    "PretaxIncome",
    "TaxProvision",
    "NetIncome",
    "NetIncomeCommonStockholders",
    "DilutedNIAvailtoComStockholders",
    "BasicEPS",
    "DilutedEPS",
    "BasicAverageShares",
    "DilutedAverageShares",
    "InterestIncome",
    "NetIncomeFromContinuingAndDiscontinuedOperation",
    "NormalizedIncome",
    "ReconciledDepreciation",
    "NetIncomeFromContinuingOperationNetMinorityInterest",
    "TotalUnusualItemsExcludingGoodwill",
    "TotalUnusualItems",
    "TaxRateForCalcs",
    "TaxEffectOfUnusualItems",
];

const INCOME_STATEMENT_ITEMS: &[&str] = &[
    "Amortization",
    "AmortizationOfIntangiblesIncomeStatement",
    "AverageDilutionEarnings",
    "BasicAccountingChange",
    "BasicAverageShares",
    "BasicContinuousOperations",
    "BasicDiscontinuousOperations",
    "BasicEPS",
    "BasicEPSOtherGainsLosses",
    "BasicExtraordinary",
    "ContinuingAndDiscontinuedBasicEPS",
    "ContinuingAndDiscontinuedDilutedEPS",
    "CostOfRevenue",
    "DepletionIncomeStatement",
    "DepreciationAmortizationDepletionIncomeStatement",
    "DepreciationAndAmortizationInIncomeStatement",
    "DepreciationIncomeStatement",
    "DilutedAccountingChange",
    "DilutedAverageShares",
    "DilutedContinuousOperations",
    "DilutedDiscontinuousOperations",
    "DilutedEPS",
    "DilutedEPSOtherGainsLosses",
    "DilutedExtraordinary",
    "DilutedNIAvailtoComStockholders",
    "DividendPerShare",
    "EBIT",
    "EBITDA",
    "EarningsFromEquityInterest",
    "EarningsFromEquityInterestNetOfTax",
    "ExciseTaxes",
    "GainOnSaleOfBusiness",
    "GainOnSaleOfPPE",
    "GainOnSaleOfSecurity",
    "GeneralAndAdministrativeExpense",
    "GrossProfit",
    "ImpairmentOfCapitalAssets",
    "InsuranceAndClaims",
    "InterestExpense",
    "InterestExpenseNonOperating",
    "InterestIncome",
    "InterestIncomeNonOperating",
    "MinorityInterests",
    "NetIncome",
    "NetIncomeCommonStockholders",
    "NetIncomeContinuousOperations",
    "NetIncomeDiscontinuousOperations",
    "NetIncomeExtraordinary",
    "NetIncomeFromContinuingAndDiscontinuedOperation",
    "NetIncomeFromContinuingOperationNetMinorityInterest",
    "NetIncomeFromTaxLossCarryforward",
    "NetIncomeIncludingNoncontrollingInterests",
    "NetInterestIncome",
    "NetNonOperatingInterestIncomeExpense",
    "NormalizedBasicEPS",
    "NormalizedDilutedEPS",
    "NormalizedEBITDA",
    "NormalizedIncome",
    "OperatingExpense",
    "OperatingIncome",
    "OperatingRevenue",
    "OtherGandA",
    "OtherIncomeExpense",
    "OtherNonOperatingIncomeExpenses",
    "OtherOperatingExpenses",
    "OtherSpecialCharges",
    "OtherTaxes",
    "OtherunderPreferredStockDividend",
    "PreferredStockDividends",
    "PretaxIncome",
    "ProvisionForDoubtfulAccounts",
    "ReconciledCostOfRevenue",
    "ReconciledDepreciation",
    "RentAndLandingFees",
    "RentExpenseSupplemental",
    "ReportedNormalizedBasicEPS",
    "ReportedNormalizedDilutedEPS",
    "ResearchAndDevelopment",
    "RestructuringAndMergernAcquisition",
    "SalariesAndWages",
    "SecuritiesAmortization",
    "SellingAndMarketingExpense",
    "SellingGeneralAndAdministration",
    "SpecialIncomeCharges",
    "TaxEffectOfUnusualItems",
    "TaxLossCarryforwardBasicEPS",
    "TaxLossCarryforwardDilutedEPS",
    "TaxProvision",
    "TaxRateForCalcs",
    "TotalExpenses",
    "TotalOperatingIncomeAsReported",
    "TotalOtherFinanceCost",
    "TotalRevenue",
    "TotalUnusualItems",
    "TotalUnusualItemsExcludingGoodwill",
    "WriteOff",
];
