//! Worker assignment checks for one fragment.

use fragplan_core::config::ValidatorConfig;
use fragplan_core::diagnostic::{ErrorKind, PlanError};
use fragplan_core::plan::Fragment;

/// Problems with `fragment.workers`. An absent list is always fine.
pub fn check_workers(index: usize, fragment: &Fragment, cfg: &ValidatorConfig) -> Vec<PlanError> {
    let Some(workers) = &fragment.workers else {
        return Vec::new();
    };
    let err = |kind| PlanError::new(kind).in_fragment(index);

    if workers.is_empty() {
        return vec![err(ErrorKind::EmptyWorkerList)];
    }

    let mut errors = Vec::new();
    let mut seen: Vec<i32> = Vec::with_capacity(workers.len());
    let mut reported: Vec<i32> = Vec::new();
    for &w in workers {
        if seen.contains(&w) {
            if !reported.contains(&w) {
                errors.push(err(ErrorKind::DuplicateWorker { worker: w }));
                reported.push(w);
            }
            continue;
        }
        seen.push(w);
        if !cfg.is_known_worker(w) {
            errors.push(err(ErrorKind::UnknownWorker { worker: w }));
        }
    }
    errors
}

#[cfg(test)]
mod tests {
    use super::*;

    fn codes(errs: &[PlanError]) -> Vec<&'static str> {
        errs.iter().map(|e| e.kind.code()).collect()
    }

    #[test]
    fn absent_list_is_fine() {
        assert!(check_workers(0, &Fragment::new(vec![]), &ValidatorConfig::default()).is_empty());
    }

    #[test]
    fn empty_and_duplicate_lists() {
        let cfg = ValidatorConfig::default();
        let empty = Fragment::new(vec![]).with_workers([]);
        assert_eq!(codes(&check_workers(0, &empty, &cfg)), vec!["EmptyWorkerList"]);

        let dup = Fragment::new(vec![]).with_workers([1, 2, 1, 1]);
        let errs = check_workers(3, &dup, &cfg);
        let expected = PlanError::new(ErrorKind::DuplicateWorker { worker: 1 }).in_fragment(3);
        assert_eq!(errs, vec![expected]);
    }

    #[test]
    fn unknown_workers_against_config() {
        let cfg = ValidatorConfig {
            known_workers: Some(vec![1, 2]),
            ..ValidatorConfig::default()
        };
        let frag = Fragment::new(vec![]).with_workers([1, 3, 4]);
        assert_eq!(
            codes(&check_workers(0, &frag, &cfg)),
            vec!["UnknownWorker", "UnknownWorker"]
        );
    }
}
