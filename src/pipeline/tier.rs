use super::format::{Report, Tier};

// Free-tier business rules. Fixed allow-list: everything not trimmed here
// ships to free users.
pub const FREE_SMART_QUESTION_LIMIT: usize = 2;
pub const FREE_KNOWN_ISSUE_LIMIT: usize = 2;

/// Project a report down to what the caller's tier is allowed to see.
/// Free output is always a strict subset of the paid output.
pub fn project(mut report: Report, is_paid: bool) -> Report {
    if is_paid {
        report.tier = Tier::Paid;
        return report;
    }

    report.tier = Tier::Free;
    report.negotiation_strategy = None;
    report.cost_to_own = None;
    report.pro_tips.clear();
    report.smart_questions.truncate(FREE_SMART_QUESTION_LIMIT);
    report.reliability.known_issues.truncate(FREE_KNOWN_ISSUE_LIMIT);
    report.reliability.maintenance_upcoming.clear();
    report
}
