use std::cmp::Ordering;

use stanza::style::HAlign::{Left, Right};
use stanza::style::{Header, MinWidth, Styles};
use stanza::table::{Col, Row, Table};

use spreadline::quantile::compare;

use crate::domain::Status;
use crate::matchup::MatchupProfile;
use crate::normalise::Skipped;

fn format_opt(value: Option<f64>, decimals: usize) -> String {
    value.map_or_else(|| "-".into(), |value| format!("{value:.decimals$}"))
}

/// Scheduled matchups, most predictable first. Matchups without a score trail the rest.
pub fn upcoming(matchups: &[MatchupProfile]) -> Vec<&MatchupProfile> {
    let mut upcoming: Vec<_> = matchups
        .iter()
        .filter(|matchup| matchup.status == Status::Scheduled)
        .collect();
    upcoming.sort_by(|a, b| {
        let by_score = match (a.score, b.score) {
            (Some(a), Some(b)) => compare(&b.value, &a.value),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        };
        by_score.then(a.key().cmp(&b.key()))
    });
    upcoming
}

pub fn tabulate_matchups(matchups: &[MatchupProfile], top: usize) -> Table {
    let mut table = Table::default()
        .with_cols(vec![
            Col::new(Styles::default().with(MinWidth(10)).with(Left)),
            Col::new(Styles::default().with(MinWidth(20)).with(Left)),
            Col::new(Styles::default().with(MinWidth(6)).with(Right)),
            Col::new(Styles::default().with(MinWidth(6)).with(Right)),
            Col::new(Styles::default().with(MinWidth(6)).with(Right)),
            Col::new(Styles::default().with(MinWidth(8)).with(Right)),
            Col::new(Styles::default().with(MinWidth(8)).with(Right)),
            Col::new(Styles::default().with(MinWidth(8)).with(Left)),
            Col::new(Styles::default().with(MinWidth(6)).with(Right)),
            Col::new(Styles::default().with(MinWidth(8)).with(Left)),
        ])
        .with_row(Row::new(
            Styles::default().with(Header(true)),
            vec![
                "Occurrence".into(),
                "Start".into(),
                "Home".into(),
                "Away".into(),
                "Spread".into(),
                "Stdev".into(),
                "Blowout".into(),
                "Tier".into(),
                "Score".into(),
                "Verdict".into(),
            ],
        ));
    for matchup in upcoming(matchups).into_iter().take(top) {
        table.push_row(Row::new(
            Styles::default(),
            vec![
                format!("{}", matchup.occurrence).into(),
                matchup.timestamp.format("%Y-%m-%d %H:%M").to_string().into(),
                format!("{}", matchup.home.participant).into(),
                format!("{}", matchup.away.participant).into(),
                format!("{:+.1}", matchup.spread).into(),
                format_opt(matchup.combined_stdev, 2).into(),
                format_opt(matchup.blowout_risk, 3).into(),
                matchup
                    .tier
                    .map_or_else(|| "-".into(), |tier| tier.to_string())
                    .into(),
                format_opt(matchup.score.map(|score| score.value), 1).into(),
                matchup
                    .score
                    .map_or_else(|| "-".into(), |score| score.verdict.to_string())
                    .into(),
            ],
        ));
    }
    table
}

pub fn tabulate_skipped(skipped: &[Skipped]) -> Table {
    let mut table = Table::default()
        .with_cols(vec![
            Col::new(Styles::default().with(MinWidth(10)).with(Left)),
            Col::new(Styles::default().with(MinWidth(20)).with(Left)),
        ])
        .with_row(Row::new(
            Styles::default().with(Header(true)),
            vec!["Occurrence".into(), "Reason".into()],
        ));
    for skip in skipped {
        table.push_row(Row::new(
            Styles::default(),
            vec![format!("{}", skip.occurrence).into(), skip.reason.to_string().into()],
        ));
    }
    table
}
