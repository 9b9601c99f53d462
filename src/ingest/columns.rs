//! Column resolution - map arbitrary header spellings onto canonical fields / 列映射
//!
//! Each canonical field has a ranked alias list. Aliases are tried in order and the
//! first one contained in any header (compared without case, spaces or underscores)
//! wins; within one alias the leftmost header wins.

use crate::error::{AppError, Result};
use crate::utils::compact_key;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CanonicalField {
    GroupNo,
    Usn,
    Name,
    ProjectTitle,
    GuideName,
    Outcomes,
    ProofLink,
    ReportLinks,
    PptLinks,
}

impl CanonicalField {
    /// Resolution order: specific fields claim their headers before generic aliases
    /// such as `name` or `link` get a chance to.
    pub const RESOLUTION_ORDER: [CanonicalField; 9] = [
        Self::GroupNo,
        Self::Usn,
        Self::ProjectTitle,
        Self::GuideName,
        Self::Name,
        Self::ReportLinks,
        Self::PptLinks,
        Self::ProofLink,
        Self::Outcomes,
    ];

    pub fn column(self) -> &'static str {
        match self {
            Self::GroupNo => "group_no",
            Self::Usn => "usn",
            Self::Name => "name",
            Self::ProjectTitle => "project_title",
            Self::GuideName => "guide_name",
            Self::Outcomes => "outcomes",
            Self::ProofLink => "proof_link",
            Self::ReportLinks => "report_links",
            Self::PptLinks => "ppt_links",
        }
    }

    pub fn aliases(self) -> &'static [&'static str] {
        match self {
            Self::GroupNo => &["groupno", "group", "grp"],
            Self::Usn => &["usn"],
            Self::Name => &["name", "student"],
            Self::ProjectTitle => &["projecttitle", "project", "title"],
            Self::GuideName => &["guidename", "guide", "mentor"],
            Self::Outcomes => &["outcomes", "outcome", "result"],
            Self::ProofLink => &["prooflink", "proof", "link"],
            Self::ReportLinks => &["reportlink", "report"],
            Self::PptLinks => &["pptlink", "ppt", "presentation"],
        }
    }

    pub fn is_required(self) -> bool {
        matches!(
            self,
            Self::GroupNo
                | Self::Usn
                | Self::Name
                | Self::ProjectTitle
                | Self::GuideName
                | Self::Outcomes
                | Self::ProofLink
        )
    }
}

/// Index of the header matching the first alias that matches anything
pub fn match_column(headers: &[String], aliases: &[&str]) -> Option<usize> {
    match_unclaimed(headers, aliases, &[])
}

fn match_unclaimed(headers: &[String], aliases: &[&str], claimed: &[usize]) -> Option<usize> {
    let keys: Vec<String> = headers.iter().map(|h| compact_key(h)).collect();
    aliases.iter().find_map(|alias| {
        let alias = compact_key(alias);
        keys.iter()
            .enumerate()
            .filter(|(index, _)| !claimed.contains(index))
            .find(|(_, key)| !key.is_empty() && key.contains(&alias))
            .map(|(index, _)| index)
    })
}

/// Header positions of the canonical fields / 列位置
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMap {
    pub group_no: usize,
    pub usn: usize,
    pub name: usize,
    pub project_title: usize,
    pub guide_name: usize,
    pub outcomes: usize,
    pub proof_link: usize,
    pub report_links: Option<usize>,
    pub ppt_links: Option<usize>,
}

/// Resolve every canonical field; a header is claimed by at most one field
pub fn resolve_columns(headers: &[String]) -> Result<ColumnMap> {
    let mut claimed: Vec<usize> = Vec::new();
    let mut found: [Option<usize>; 9] = [None; 9];

    for field in CanonicalField::RESOLUTION_ORDER {
        match match_unclaimed(headers, field.aliases(), &claimed) {
            Some(index) => {
                claimed.push(index);
                found[field as usize] = Some(index);
            }
            None if field.is_required() => {
                return Err(AppError::MissingColumn {
                    field: field.column(),
                    available: headers.to_vec(),
                });
            }
            None => {}
        }
    }

    let required = |field: CanonicalField| {
        found[field as usize].ok_or(AppError::MissingColumn {
            field: field.column(),
            available: headers.to_vec(),
        })
    };

    Ok(ColumnMap {
        group_no: required(CanonicalField::GroupNo)?,
        usn: required(CanonicalField::Usn)?,
        name: required(CanonicalField::Name)?,
        project_title: required(CanonicalField::ProjectTitle)?,
        guide_name: required(CanonicalField::GuideName)?,
        outcomes: required(CanonicalField::Outcomes)?,
        proof_link: required(CanonicalField::ProofLink)?,
        report_links: found[CanonicalField::ReportLinks as usize],
        ppt_links: found[CanonicalField::PptLinks as usize],
    })
}
