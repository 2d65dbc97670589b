//! Scoring rubrics for the built-in leverage signals and anti-patterns.

pub const SHOCKING_NUMBER_CONTRAST: &str = "shocking_number_contrast";
pub const SIDE_BY_SIDE_COMPARISON: &str = "side_by_side_comparison";
pub const CONTRARIAN_WITH_PROOF: &str = "contrarian_with_proof";
pub const DETAILED_BREAKDOWN: &str = "detailed_breakdown";
pub const REVEALS_HIDDEN_MECHANISM: &str = "reveals_hidden_mechanism";
pub const COMEBACK_STORY: &str = "comeback_story";
pub const DAVID_VS_GOLIATH: &str = "david_vs_goliath";

pub const CRINGY_HOOK: &str = "cringy_hook";
pub const BROAD_APPEAL: &str = "broad_appeal";
pub const FORENSIC_DETAIL: &str = "forensic_detail";

/// Rubric text for a built-in scorer name.
pub fn rubric(name: &str) -> Option<&'static str> {
    let text = match name {
        SHOCKING_NUMBER_CONTRAST => {
            "Two specific numbers placed against each other so the gap itself is the \
             surprise (\"$9.2M vs $4M per store\", \"17x the revenue on a third of the \
             locations\"). Score high when the contrast is concrete, appears early, and \
             the gap is large enough to make a reader stop. Score low for a single \
             statistic, rounded or vague figures (\"much more\", \"millions\"), or \
             numbers buried where they do no work."
        }
        SIDE_BY_SIDE_COMPARISON => {
            "Two comparable entities examined on the same dimensions so the reader can \
             see exactly where they diverge: same market, different outcome. Score high \
             when the comparison is structured and every dimension is backed by data. \
             Score low when only one side is described or the comparison is loose."
        }
        CONTRARIAN_WITH_PROOF => {
            "Challenges a belief most readers hold and then proves the opposite with \
             evidence. Score high when the common view is stated fairly and the proof is \
             specific and verifiable. Score low for contrarianism without evidence, or \
             evidence for a view nobody disputes."
        }
        DETAILED_BREAKDOWN => {
            "Walks through the unit economics or mechanics step by step, with the \
             arithmetic shown (revenue per store, margin per item, payback period). \
             Score high when a reader could redo the math from the post. Score low for \
             summaries that assert results without showing how they add up."
        }
        REVEALS_HIDDEN_MECHANISM => {
            "Explains the non-obvious cause behind a visible outcome: the contract term, \
             incentive, or operational lever most observers miss. Score high when the \
             mechanism is specific and changes how the reader understands the outcome. \
             Score low for hand-wavy causes (\"great culture\", \"strong brand\")."
        }
        COMEBACK_STORY => {
            "A fall followed by a recovery, told with the numbers at the low point and \
             now, and the turning decision in between. Score high when the timeline and \
             the turning point are concrete. Score low when there is no real low point or \
             the recovery is asserted without data."
        }
        DAVID_VS_GOLIATH => {
            "A smaller player beating or out-executing a much larger one, with the size \
             gap and the winning advantage quantified. Score high when the underdog's \
             edge is specific. Score low when sizes are vague or the win is anecdotal."
        }
        CRINGY_HOOK => {
            "Clickbait or performative openers: \"let that sink in\", \"here's the \
             kicker\", \"nobody is talking about this\", rhetorical questions, emojis, \
             all-caps, bolded shouting. Score 1.0 when the opening is plain and \
             specific. Score low when the hook leans on tone instead of substance."
        }
        BROAD_APPEAL => {
            "Generic takes written for everyone and therefore no one: obvious insights \
             (\"consistency matters\", \"customers like value\"), motivational framing, \
             advice that fits any industry. Score 1.0 when the post is written for \
             people who know the industry. Score low when an informed reader would learn \
             nothing."
        }
        FORENSIC_DETAIL => {
            "Detail for its own sake: long lists of figures, dates or line items that do \
             not serve the argument and bury the insight. Score 1.0 when every number \
             earns its place. Score low when the reader has to dig for the point."
        }
        _ => return None,
    };
    Some(text)
}

/// Built-in signal names, in default weight order.
pub const SIGNALS: [&str; 7] = [
    SHOCKING_NUMBER_CONTRAST,
    SIDE_BY_SIDE_COMPARISON,
    CONTRARIAN_WITH_PROOF,
    DETAILED_BREAKDOWN,
    REVEALS_HIDDEN_MECHANISM,
    COMEBACK_STORY,
    DAVID_VS_GOLIATH,
];

pub const ANTI_PATTERNS: [&str; 3] = [CRINGY_HOOK, BROAD_APPEAL, FORENSIC_DETAIL];
