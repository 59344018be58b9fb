//! K2 campaigns 9, 10 and 11 were executed in two halves. The archive files
//! both halves under the same campaign number; here each product is relabelled
//! with the half it belongs to ("09a", "09b").

use std::collections::BTreeMap;

use crate::catalog::Observation;
use crate::domain::Mission;

pub const SPLIT_CAMPAIGNS: [u32; 3] = [9, 10, 11];

// MJD separating the two halves, used when only one half is present.
const SPLIT_EPOCHS: [(u32, f64); 3] = [(9, 57528.0), (10, 57585.5), (11, 57680.5)];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Half {
    A,
    B,
}

impl Half {
    fn suffix(&self) -> char {
        match self {
            Half::A => 'a',
            Half::B => 'b',
        }
    }
}

pub fn is_split_campaign(campaign: u32) -> bool {
    SPLIT_CAMPAIGNS.contains(&campaign)
}

pub fn label(campaign: u32, half: Option<Half>) -> String {
    match half {
        Some(half) => format!("{campaign:02}{}", half.suffix()),
        None => format!("{campaign:02}"),
    }
}

/// Archive sub-campaign codes (91, 92, 101, 102, 111, 112).
pub fn archive_half(sequence: u32) -> Option<(u32, Half)> {
    let campaign = sequence / 10;
    if !is_split_campaign(campaign) {
        return None;
    }
    match sequence % 10 {
        1 => Some((campaign, Half::A)),
        2 => Some((campaign, Half::B)),
        _ => None,
    }
}

/// Relabels the rows of `campaign` by observing window. Rows of other
/// missions or campaigns, rows already labelled, and rows with no time
/// coverage are returned unchanged.
pub fn split(mut rows: Vec<Observation>, campaign: u32) -> Vec<Observation> {
    if !is_split_campaign(campaign) {
        return rows;
    }

    let mut by_target: BTreeMap<String, Vec<usize>> = BTreeMap::new();
    for (index, row) in rows.iter().enumerate() {
        if row.mission == Mission::K2
            && row.sequence == campaign
            && !row.is_split_labelled()
            && row.t_min.is_some()
            && row.t_max.is_some()
        {
            by_target
                .entry(row.target_name.clone())
                .or_default()
                .push(index);
        }
    }

    for (target, indices) in by_target {
        let windows = windows(&rows, &indices);
        if windows.len() > 2 {
            tracing::debug!(
                target_name = %target,
                campaign,
                windows = windows.len(),
                "more than two observing windows; later windows join the second half"
            );
        }
        let halves: Vec<Half> = if windows.len() >= 2 {
            (0..windows.len())
                .map(|position| if position == 0 { Half::A } else { Half::B })
                .collect()
        } else {
            windows
                .iter()
                .map(|window| half_by_epoch(campaign, (window.start + window.end) / 2.0))
                .collect()
        };

        for (window, half) in windows.iter().zip(halves) {
            for &index in &window.rows {
                rows[index].obs_id = label(campaign, Some(half));
            }
        }
        tracing::debug!(target_name = %target, campaign, "relabelled split campaign rows");
    }

    rows
}

struct Window {
    start: f64,
    end: f64,
    rows: Vec<usize>,
}

fn windows(rows: &[Observation], indices: &[usize]) -> Vec<Window> {
    let mut ordered: Vec<(usize, f64, f64)> = indices
        .iter()
        .filter_map(|&index| {
            let row = &rows[index];
            Some((index, row.t_min?, row.t_max?))
        })
        .collect();
    ordered.sort_by(|a, b| a.1.total_cmp(&b.1));

    let mut windows: Vec<Window> = Vec::new();
    for (index, start, end) in ordered {
        match windows.last_mut() {
            Some(current) if start <= current.end => {
                current.end = current.end.max(end);
                current.rows.push(index);
            }
            _ => windows.push(Window {
                start,
                end,
                rows: vec![index],
            }),
        }
    }
    windows
}

fn half_by_epoch(campaign: u32, midpoint: f64) -> Half {
    let epoch = SPLIT_EPOCHS
        .iter()
        .find(|(number, _)| *number == campaign)
        .map(|(_, epoch)| *epoch)
        .unwrap_or(f64::INFINITY);
    if midpoint < epoch { Half::A } else { Half::B }
}
