use reader_core::model::SessionState;

/// Aggregated view of reading progress, useful for UI.
///
/// Derived on demand; nothing here is stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionProgress {
    pub total_sections: usize,
    pub completed_sections: usize,
    pub current_section: usize,
    pub is_last_section: bool,
    pub all_sections_complete: bool,
    pub final_submitted: bool,
    pub final_score: Option<u32>,
    pub final_total: usize,
    pub final_result_saved: bool,
}

impl SessionProgress {
    #[must_use]
    pub fn from_state(state: &SessionState) -> Self {
        let final_test = state.final_test().filter(|test| test.submitted());
        Self {
            total_sections: state.section_count(),
            completed_sections: state.completed_sections().len(),
            current_section: state.current_section_index(),
            is_last_section: state.is_last_section(state.current_section_index()),
            all_sections_complete: state.all_sections_complete(),
            final_submitted: final_test.is_some(),
            final_score: final_test.map(|test| test.score()),
            final_total: state.content().map_or(0, |content| content.final_test.len()),
            final_result_saved: state.is_final_result_saved(),
        }
    }
}
