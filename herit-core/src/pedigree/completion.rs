//! Pedigree completion.
//!
//! Individuals that appear only as a dam or sire get a row of their own with
//! both parents unknown. These founder rows go to the top of the table, and
//! the remaining rows are reordered where necessary so that every parent
//! precedes its offspring.

use std::collections::{HashMap, HashSet};

use tracing::{debug, info};

use herit_data::tables::PedigreeRow;

use super::Pedigree;

/// Complete a pedigree with a founder generation.
///
/// `founders` names individuals whose parents should be treated as unknown.
/// With `None`, founders are auto-detected as referenced parents without a
/// row. Original rows are preserved apart from that explicit override.
pub fn complete_pedigree(pedigree: Pedigree, founders: Option<&[i64]>) -> Pedigree {
    let mut rows = pedigree.into_rows();

    if let Some(founders) = founders {
        let founders: HashSet<i64> = founders.iter().copied().collect();
        for row in rows.iter_mut().filter(|r| founders.contains(&r.animal)) {
            row.dam = None;
            row.sire = None;
        }
    }

    let missing = Pedigree::from_rows(rows.clone()).missing_parents();
    if !missing.is_empty() {
        info!("Inserting {} founder rows for parents without records", missing.len());
    }

    let mut completed: Vec<PedigreeRow> = missing.into_iter().map(PedigreeRow::founder).collect();
    completed.extend(rows);

    Pedigree::from_rows(parents_first(completed))
}

/// Stable reorder so that parents precede offspring.
///
/// Rows already in a valid order are left untouched. Cycles cannot be
/// ordered and are left for `validate` to reject.
fn parents_first(rows: Vec<PedigreeRow>) -> Vec<PedigreeRow> {
    let index: HashMap<i64, usize> = rows.iter().enumerate().map(|(i, r)| (r.animal, i)).collect();

    #[derive(Clone, Copy, PartialEq)]
    enum Mark {
        Unvisited,
        InProgress,
        Done,
    }

    let mut marks = vec![Mark::Unvisited; rows.len()];
    let mut order = Vec::with_capacity(rows.len());

    for start in 0..rows.len() {
        if marks[start] != Mark::Unvisited {
            continue;
        }
        // Iterative DFS: (row index, parents expanded?)
        let mut stack = vec![(start, false)];
        while let Some((i, expanded)) = stack.pop() {
            if expanded {
                if marks[i] != Mark::Done {
                    marks[i] = Mark::Done;
                    order.push(i);
                }
                continue;
            }
            if marks[i] != Mark::Unvisited {
                continue;
            }
            marks[i] = Mark::InProgress;
            stack.push((i, true));
            // Push sire then dam so the dam is emitted first.
            let parents: Vec<usize> = rows[i]
                .parents()
                .filter_map(|p| index.get(&p).copied())
                .collect();
            for &j in parents.iter().rev() {
                if marks[j] == Mark::Unvisited {
                    stack.push((j, false));
                }
            }
        }
    }

    let moved = order.iter().enumerate().filter(|&(pos, &i)| pos != i).count();
    if moved > 0 {
        debug!("Reordered {} pedigree rows so parents precede offspring", moved);
    }

    order.into_iter().map(|i| rows[i]).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn child(animal: i64, dam: i64) -> PedigreeRow {
        PedigreeRow {
            animal,
            dam: Some(dam),
            sire: None,
        }
    }

    #[test]
    fn test_inserts_missing_dams_at_top() {
        let ped = Pedigree::from_rows(vec![
            child(1000, 70_000),
            child(2000, 70_000),
            child(3000, 80_000),
            child(4000, 90_000),
            child(5000, 90_000),
        ]);
        let done = complete_pedigree(ped, None);

        assert_eq!(done.len(), 8);
        assert_eq!(
            &done.rows()[..3],
            &[
                PedigreeRow::founder(70_000),
                PedigreeRow::founder(80_000),
                PedigreeRow::founder(90_000)
            ]
        );
        assert_eq!(done.rows()[3], child(1000, 70_000));
        assert!(done.validate().is_ok());
    }

    #[test]
    fn test_complete_pedigree_unchanged() {
        let rows = vec![PedigreeRow::founder(1), child(2, 1)];
        let done = complete_pedigree(Pedigree::from_rows(rows.clone()), None);
        assert_eq!(done.rows(), rows.as_slice());
    }

    #[test]
    fn test_explicit_founders() {
        let rows = vec![PedigreeRow::founder(1), child(2, 1), child(3, 2)];
        let done = complete_pedigree(Pedigree::from_rows(rows), Some(&[2][..]));
        assert_eq!(done.get(2).unwrap().dam, None);
        assert_eq!(done.get(3).unwrap().dam, Some(2));
        assert_eq!(done.len(), 3);
    }

    #[test]
    fn test_reorders_parent_listed_late() {
        // After sorting by ID, dam 5000 is recorded after offspring 1000.
        let rows = vec![child(1000, 5000), child(5000, 90_000)];
        let done = complete_pedigree(Pedigree::from_rows(rows), None);
        let order: Vec<i64> = done.rows().iter().map(|r| r.animal).collect();
        assert_eq!(order, vec![90_000, 5000, 1000]);
        assert!(done.validate().is_ok());
    }

    #[test]
    fn test_cycle_rejected_by_validate() {
        let rows = vec![child(1, 2), child(2, 1)];
        let done = complete_pedigree(Pedigree::from_rows(rows), None);
        assert!(done.validate().is_err());
    }
}
