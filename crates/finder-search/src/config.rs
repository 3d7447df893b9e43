use finder_query::NormalizeConfig;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SearchConfig {
    pub normalize: NormalizeConfig,
    /// Drop the current results while a grouping toggle re-searches.
    pub clear_results_on_toggle: bool,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            normalize: NormalizeConfig::default(),
            clear_results_on_toggle: true,
        }
    }
}
