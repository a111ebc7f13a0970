//! Token budgeting.
//!
//! Wraps the model tokenizer behind two operations: truncating free text to
//! a model's context budget and splitting long file content into
//! budget-sized pages.

use thiserror::Error;
use tiktoken_rs::{get_bpe_from_model, CoreBPE};

/// Context budget per supported chat model, in tokens.
const MODEL_TOKEN_BUDGETS: &[(&str, usize)] = &[
    ("gpt-4", 6000),
    ("gpt-4-0314", 6000),
    ("gpt-4-32k", 30000),
    ("gpt-4-32k-0314", 30000),
    ("gpt-3.5-turbo", 3000),
    ("gpt-3.5-turbo-0301", 3000),
];

/// Token budget applied to nested fields embedded in message documents.
pub const NESTED_FIELD_TOKEN_BUDGET: usize = 100;

#[derive(Debug, Error)]
pub enum BudgetError {
    #[error("unsupported model `{0}`")]
    UnsupportedModel(String),
    #[error("tokenizer failure: {0}")]
    Tokenizer(String),
}

/// Model-aware text truncation and paging.
pub struct TextBudgeter {
    budget: usize,
    bpe: CoreBPE,
}

impl TextBudgeter {
    pub fn new(model: &str) -> Result<Self, BudgetError> {
        let budget = budget_for(model)?;
        let bpe =
            get_bpe_from_model(model).map_err(|err| BudgetError::Tokenizer(err.to_string()))?;
        Ok(Self { budget, bpe })
    }

    /// The full context budget for the model this budgeter was built for.
    pub fn budget(&self) -> usize {
        self.budget
    }

    /// Truncates `text` to `budget - 1` tokens, marking cuts with `"..."`.
    ///
    /// Text that already fits comes back unchanged, so truncation is
    /// idempotent. `budget` defaults to the model's full budget.
    pub fn truncate(&self, text: &str, budget: Option<usize>) -> Result<String, BudgetError> {
        let budget = budget.unwrap_or(self.budget);
        let tokens = self.bpe.encode_with_special_tokens(text);
        let keep = tokens.len().min(budget.saturating_sub(1));
        let truncated = self
            .bpe
            .decode(tokens[..keep].to_vec())
            .map_err(|err| BudgetError::Tokenizer(err.to_string()))?;
        if truncated.chars().count() == text.chars().count() {
            return Ok(text.to_string());
        }
        Ok(format!("{truncated}..."))
    }

    /// The number of tokens `text` encodes to.
    pub fn token_count(&self, text: &str) -> usize {
        self.bpe.encode_with_special_tokens(text).len()
    }

    /// Splits `text` into pages of at most one full budget each.
    ///
    /// Empty text produces no pages, and so no documents downstream.
    pub fn split(&self, text: &str) -> Result<Vec<String>, BudgetError> {
        let tokens = self.bpe.encode_with_special_tokens(text);
        tokens
            .chunks(self.budget)
            .map(|chunk| {
                self.bpe
                    .decode(chunk.to_vec())
                    .map_err(|err| BudgetError::Tokenizer(err.to_string()))
            })
            .collect()
    }
}

/// Looks up the token budget for `model`, rejecting unknown models.
pub fn budget_for(model: &str) -> Result<usize, BudgetError> {
    MODEL_TOKEN_BUDGETS
        .iter()
        .find(|(name, _)| *name == model)
        .map(|(_, budget)| *budget)
        .ok_or_else(|| BudgetError::UnsupportedModel(model.to_string()))
}
