// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Marketgate

//! The feature catalog: every gateable feature and its minimum tier.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::Tier;

/// Closed set of gateable features. Route configuration that names a
/// feature outside this set falls through to the evaluator's fail-open
/// branch; adding a feature means adding a variant here, which the
/// compiler then forces through [`Feature::min_tier`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "kebab-case")]
pub enum Feature {
    AdvancedCharts,
    CustomAlerts,
    TradingSignals,
    MarketHeatmap,
    CycleAnalysis,
    CsvExport,
    AiForecasts,
    ApiAccess,
}

impl Feature {
    /// The minimum tier that unlocks this feature.
    pub fn min_tier(self) -> Tier {
        match self {
            Feature::AdvancedCharts
            | Feature::CustomAlerts
            | Feature::TradingSignals
            | Feature::MarketHeatmap => Tier::Basic,
            Feature::CycleAnalysis | Feature::CsvExport => Tier::Premium,
            Feature::AiForecasts | Feature::ApiAccess => Tier::Pro,
        }
    }

    /// Kebab-case wire name, as used in route configuration and denial
    /// payloads.
    pub fn name(self) -> &'static str {
        match self {
            Feature::AdvancedCharts => "advanced-charts",
            Feature::CustomAlerts => "custom-alerts",
            Feature::TradingSignals => "trading-signals",
            Feature::MarketHeatmap => "market-heatmap",
            Feature::CycleAnalysis => "cycle-analysis",
            Feature::CsvExport => "csv-export",
            Feature::AiForecasts => "ai-forecasts",
            Feature::ApiAccess => "api-access",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "advanced-charts" => Some(Feature::AdvancedCharts),
            "custom-alerts" => Some(Feature::CustomAlerts),
            "trading-signals" => Some(Feature::TradingSignals),
            "market-heatmap" => Some(Feature::MarketHeatmap),
            "cycle-analysis" => Some(Feature::CycleAnalysis),
            "csv-export" => Some(Feature::CsvExport),
            "ai-forecasts" => Some(Feature::AiForecasts),
            "api-access" => Some(Feature::ApiAccess),
            _ => None,
        }
    }
}

impl std::fmt::Display for Feature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
