//! Static tactic catalog.
//!
//! Tactics are grouped into six escalating phases. Order within and across
//! phases is significant: later, more invasive tactics assume earlier ones
//! have already run.

use serde::{Deserialize, Serialize};

/// Identifies one capability probe in the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TacticId {
    RemoveOverlays,
    ExpandContent,
    RemoveSticky,
    RevealHidden,
    DisableLazyLoading,
    BypassRightClick,
    BypassPaywall,
    ManipulateCookies,
    OverrideJsChecks,
    SpoofReferrer,
    ExtractHiddenData,
    ExtractShadowDom,
    ExtractStorage,
    ExtractCanvas,
    DetectAjax,
    InterceptDownloads,
    HumanizeBrowser,
    ProbeEndpoints,
    BypassCloudflare,
}

impl std::fmt::Display for TacticId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let json = serde_json::to_value(self).map_err(|_| std::fmt::Error)?;
        write!(f, "{}", json.as_str().unwrap_or("unknown"))
    }
}

/// How disruptive a tactic is to the page. Drives pacing and the safe
/// catalog cut.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Invasiveness {
    /// Read-only or cosmetic DOM adjustments.
    Low,
    /// Mutates page state, cookies, or globals.
    Medium,
    /// Network probing and anti-detection measures.
    High,
}

/// One catalog entry: metadata only, behavior lives in the probe table.
#[derive(Debug, Clone, Copy)]
pub struct TacticDefinition {
    pub id: TacticId,
    /// Phase number, the ordering key. Phases escalate 1 through 6.
    pub phase: u8,
    pub tier: Invasiveness,
    pub description: &'static str,
}

use Invasiveness::{High, Low, Medium};
use TacticId::*;

/// The full liberation sequence, ordered by increasing invasiveness.
///
/// Phase 1: visibility enhancement. Phase 2: access enhancement.
/// Phase 3: authentication and cookies. Phase 4: data extraction.
/// Phase 5: network analysis. Phase 6: advanced tactics.
const LIBERATION: &[TacticDefinition] = &[
    TacticDefinition { id: RemoveOverlays, phase: 1, tier: Low, description: "Remove modal overlays and popups" },
    TacticDefinition { id: ExpandContent, phase: 1, tier: Low, description: "Expand all collapsed content" },
    TacticDefinition { id: RemoveSticky, phase: 1, tier: Low, description: "Remove sticky headers and footers" },
    TacticDefinition { id: RevealHidden, phase: 1, tier: Low, description: "Make hidden elements visible" },
    TacticDefinition { id: DisableLazyLoading, phase: 1, tier: Low, description: "Force lazy-loaded content to appear" },
    TacticDefinition { id: BypassRightClick, phase: 2, tier: Medium, description: "Enable right-click and text selection" },
    TacticDefinition { id: BypassPaywall, phase: 2, tier: Medium, description: "Attempt paywall bypass techniques" },
    TacticDefinition { id: ManipulateCookies, phase: 3, tier: Medium, description: "Set consent and verification cookies" },
    TacticDefinition { id: OverrideJsChecks, phase: 3, tier: Medium, description: "Override JavaScript access checks" },
    TacticDefinition { id: SpoofReferrer, phase: 3, tier: Medium, description: "Spoof referrer to appear from search" },
    TacticDefinition { id: ExtractHiddenData, phase: 4, tier: Low, description: "Extract all hidden metadata" },
    TacticDefinition { id: ExtractShadowDom, phase: 4, tier: Low, description: "Extract shadow DOM content" },
    TacticDefinition { id: ExtractStorage, phase: 4, tier: Low, description: "Extract browser storage data" },
    TacticDefinition { id: ExtractCanvas, phase: 4, tier: Low, description: "Extract canvas and chart data" },
    TacticDefinition { id: DetectAjax, phase: 5, tier: Low, description: "Deep AJAX pattern detection" },
    TacticDefinition { id: InterceptDownloads, phase: 5, tier: Medium, description: "Intercept download attempts" },
    TacticDefinition { id: HumanizeBrowser, phase: 6, tier: High, description: "Make browser appear human-controlled" },
    TacticDefinition { id: ProbeEndpoints, phase: 6, tier: High, description: "Probe for hidden API endpoints" },
    TacticDefinition { id: BypassCloudflare, phase: 6, tier: High, description: "Check for active bot challenges" },
];

/// Non-invasive subset used in safe mode. The sequence is fixed: extraction
/// runs before lazy-loading is forced so the census baseline stays quiet.
const SAFE: &[TacticDefinition] = &[
    TacticDefinition { id: RemoveOverlays, phase: 1, tier: Low, description: "Remove popups and overlays blocking content" },
    TacticDefinition { id: ExpandContent, phase: 1, tier: Low, description: "Expand collapsed sections and hidden content" },
    TacticDefinition { id: ExtractHiddenData, phase: 1, tier: Low, description: "Extract metadata and hidden information" },
    TacticDefinition { id: DetectAjax, phase: 1, tier: Low, description: "Monitor AJAX and dynamic content patterns" },
    TacticDefinition { id: DisableLazyLoading, phase: 1, tier: Low, description: "Force lazy-loaded content to appear" },
    TacticDefinition { id: ExtractShadowDom, phase: 1, tier: Low, description: "Extract content from shadow DOM elements" },
];

/// The full ordered catalog.
pub fn liberation_catalog() -> &'static [TacticDefinition] {
    LIBERATION
}

/// The safe-mode catalog: lowest-invasiveness tactics only.
pub fn safe_catalog() -> &'static [TacticDefinition] {
    SAFE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phases_never_decrease() {
        let mut last = 0;
        for def in liberation_catalog() {
            assert!(def.phase >= last, "{:?} breaks phase ordering", def.id);
            last = def.phase;
        }
        assert_eq!(last, 6);
    }

    #[test]
    fn test_safe_catalog_is_low_tier_only() {
        for def in safe_catalog() {
            assert_eq!(def.tier, Invasiveness::Low, "{:?} is not safe", def.id);
            assert_eq!(def.phase, 1);
        }
    }

    #[test]
    fn test_safe_catalog_order_is_fixed() {
        let ids: Vec<TacticId> = safe_catalog().iter().map(|d| d.id).collect();
        assert_eq!(
            ids,
            [
                RemoveOverlays,
                ExpandContent,
                ExtractHiddenData,
                DetectAjax,
                DisableLazyLoading,
                ExtractShadowDom,
            ]
        );
    }

    #[test]
    fn test_safe_catalog_is_subset_of_full() {
        for def in safe_catalog() {
            assert!(
                liberation_catalog().iter().any(|d| d.id == def.id),
                "{:?} missing from full catalog",
                def.id
            );
        }
    }

    #[test]
    fn test_tactic_ids_unique() {
        let mut seen = std::collections::HashSet::new();
        for def in liberation_catalog() {
            assert!(seen.insert(def.id), "duplicate tactic {:?}", def.id);
        }
        assert_eq!(seen.len(), 19);
    }

    #[test]
    fn test_display_is_snake_case() {
        assert_eq!(TacticId::RemoveOverlays.to_string(), "remove_overlays");
        assert_eq!(TacticId::BypassCloudflare.to_string(), "bypass_cloudflare");
    }
}
