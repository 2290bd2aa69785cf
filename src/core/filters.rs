use crate::models::{Cohort, PregnancyStatus};

/// Age at which a participant stops counting as pediatric
pub const ADULT_AGE: u8 = 18;

/// Check whether a participant may enrol in a site with the given cohort
///
/// Rules are exclusionary and evaluated in order:
/// 1. Pediatric sites exclude participants aged 18 or over
/// 2. Adult sites exclude participants under 18
/// 3. Pregnancy sites exclude anyone not confirmed pregnant
///
/// Any other cohort admits everyone.
#[inline]
pub fn is_eligible(cohort: &Cohort, age: u8, pregnancy_status: PregnancyStatus) -> bool {
    match cohort {
        Cohort::Pediatric if age >= ADULT_AGE => false,
        Cohort::Adult if age < ADULT_AGE => false,
        Cohort::Pregnancy if pregnancy_status != PregnancyStatus::Yes => false,
        _ => true,
    }
}
