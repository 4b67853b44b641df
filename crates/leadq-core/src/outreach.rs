/// Build the first-touch outreach message for a lead.
///
/// Pure: the same handle and niche always produce the same text.
#[must_use]
pub fn build_outreach_dm(handle: &str, niche_guess: Option<&str>) -> String {
    let niche_part = niche_guess
        .map(str::trim)
        .filter(|niche| !niche.is_empty())
        .map(|niche| format!(" in the {niche} space"))
        .unwrap_or_default();

    format!(
        "Hey {handle} \u{2014} saw what you're doing{niche_part} on IG.\n\
         \n\
         I build revenue-focused sites for coaches, founders and service businesses.\n\
         \n\
         If you like, I can send you a quick 90\u{2013}120s Loom breaking down:\n\
         \u{2022} 1\u{2013}2 fast trust tweaks\n\
         \u{2022} 1 clear conversion improvement for your site\n\
         \n\
         No pressure either way, just thought it might be useful. Want me to record one for you?"
    )
}
