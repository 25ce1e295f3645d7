//! Skill-gap analysis.
//!
//! Explains which missing skills keep cases unassigned, how well each
//! required skill is covered by the current run, and what adding one person
//! with a given skill would unblock.
//!
//! The hiring impact is an approximation: a case counts as unblocked by a
//! skill only when that skill is the *only* one it is missing. No routing is
//! re-run, so the case might still fail on time windows, working hours or
//! capacity once the hire is made.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::domain::skill_label;
use crate::model::{CaseId, SkillId};

/// How many top-ranked skills get a hiring-impact estimate.
pub const HIRING_IMPACT_TOP_N: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseSkillGap {
    pub case_id: CaseId,
    pub missing_skill_ids: Vec<SkillId>,
    pub missing_skills: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillDemand {
    pub skill_id: SkillId,
    pub skill_name: String,
    /// Unassigned cases missing this skill.
    pub demand_count: usize,
    pub case_ids: Vec<CaseId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillCoverage {
    pub skill_id: SkillId,
    pub skill_name: String,
    pub cases_requiring: usize,
    pub cases_covered: usize,
    pub coverage_percent: f64,
}

/// Approximate effect of one extra person holding `skill_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HiringImpact {
    pub skill_id: SkillId,
    pub skill_name: String,
    /// Cases for which this is the only missing skill.
    pub cases_unblocked: usize,
    pub case_ids: Vec<CaseId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillGapSummary {
    pub total_cases: usize,
    pub assigned_cases: usize,
    pub unassigned_cases: usize,
    pub cases_blocked_by_skills: usize,
    /// Percentage of requested cases that were assigned.
    pub assignment_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillGapAnalysis {
    pub unassigned_cases: Vec<CaseSkillGap>,
    /// Demand descending, then skill id ascending.
    pub ranked_skills: Vec<SkillDemand>,
    pub coverage: Vec<SkillCoverage>,
    pub hiring_impact: Vec<HiringImpact>,
    pub summary: SkillGapSummary,
}

pub struct SkillGapAnalyzer<'a> {
    requirements: &'a BTreeMap<CaseId, BTreeSet<SkillId>>,
    skill_pool: &'a BTreeSet<SkillId>,
    skill_names: &'a BTreeMap<SkillId, String>,
}

impl<'a> SkillGapAnalyzer<'a> {
    /// `requirements` holds the required skills of every requested case;
    /// `skill_pool` the skills held by the active staff.
    pub fn new(
        requirements: &'a BTreeMap<CaseId, BTreeSet<SkillId>>,
        skill_pool: &'a BTreeSet<SkillId>,
        skill_names: &'a BTreeMap<SkillId, String>,
    ) -> Self {
        Self {
            requirements,
            skill_pool,
            skill_names,
        }
    }

    pub fn analyze(&self, unassigned: &BTreeSet<CaseId>) -> SkillGapAnalysis {
        let gaps: Vec<CaseSkillGap> = unassigned
            .iter()
            .map(|&case_id| {
                let missing: Vec<SkillId> = self
                    .requirements
                    .get(&case_id)
                    .map(|required| required.difference(self.skill_pool).copied().collect())
                    .unwrap_or_default();
                CaseSkillGap {
                    case_id,
                    missing_skills: missing.iter().map(|id| self.label(*id)).collect(),
                    missing_skill_ids: missing,
                }
            })
            .collect();

        let ranked_skills = self.rank(&gaps);
        let hiring_impact = ranked_skills
            .iter()
            .take(HIRING_IMPACT_TOP_N)
            .map(|demand| self.hiring_impact(demand.skill_id, &gaps))
            .collect();

        let total_cases = self.requirements.len();
        let unassigned_cases = unassigned.len();
        let assigned_cases = total_cases.saturating_sub(unassigned_cases);

        SkillGapAnalysis {
            coverage: self.coverage(unassigned),
            ranked_skills,
            hiring_impact,
            summary: SkillGapSummary {
                total_cases,
                assigned_cases,
                unassigned_cases,
                cases_blocked_by_skills: gaps.iter().filter(|g| !g.missing_skill_ids.is_empty()).count(),
                assignment_rate: percent(assigned_cases, total_cases),
            },
            unassigned_cases: gaps,
        }
    }

    fn label(&self, id: SkillId) -> String {
        skill_label(self.skill_names, id)
    }

    fn rank(&self, gaps: &[CaseSkillGap]) -> Vec<SkillDemand> {
        let mut demand: BTreeMap<SkillId, Vec<CaseId>> = BTreeMap::new();
        for gap in gaps {
            for skill in &gap.missing_skill_ids {
                demand.entry(*skill).or_default().push(gap.case_id);
            }
        }

        let mut ranked: Vec<SkillDemand> = demand
            .into_iter()
            .map(|(skill_id, case_ids)| SkillDemand {
                skill_id,
                skill_name: self.label(skill_id),
                demand_count: case_ids.len(),
                case_ids,
            })
            .collect();
        ranked.sort_by(|a, b| {
            b.demand_count
                .cmp(&a.demand_count)
                .then_with(|| a.skill_id.cmp(&b.skill_id))
        });
        ranked
    }

    fn hiring_impact(&self, skill_id: SkillId, gaps: &[CaseSkillGap]) -> HiringImpact {
        let case_ids: Vec<CaseId> = gaps
            .iter()
            .filter(|gap| gap.missing_skill_ids == [skill_id])
            .map(|gap| gap.case_id)
            .collect();
        HiringImpact {
            skill_id,
            skill_name: self.label(skill_id),
            cases_unblocked: case_ids.len(),
            case_ids,
        }
    }

    /// A case's requirement is met when the case was assigned.
    fn coverage(&self, unassigned: &BTreeSet<CaseId>) -> Vec<SkillCoverage> {
        let mut counts: BTreeMap<SkillId, (usize, usize)> = BTreeMap::new();
        for (case_id, required) in self.requirements {
            let covered = !unassigned.contains(case_id);
            for skill in required {
                let entry = counts.entry(*skill).or_default();
                entry.0 += 1;
                if covered {
                    entry.1 += 1;
                }
            }
        }

        counts
            .into_iter()
            .map(|(skill_id, (requiring, covered))| SkillCoverage {
                skill_id,
                skill_name: self.label(skill_id),
                cases_requiring: requiring,
                cases_covered: covered,
                coverage_percent: percent(covered, requiring),
            })
            .collect()
    }
}

fn percent(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        return 100.0;
    }
    part as f64 * 100.0 / whole as f64
}
