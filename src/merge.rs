//! Synthesis of one union record per cluster.
//!
//! The member with the highest [`completeness_score`] becomes the primary
//! record (ties go to the member with the lowest [`RecordId`], i.e. the
//! earliest declared source). The merged record takes:
//!
//! - the primary's leader, with lengths cleared;
//! - the primary's control fields, plus any control tag the primary lacks,
//!   from the first other member that has it;
//! - data fields in member order (primary first), each member's fields in
//!   their record order. With `prefer-fields` each tag is copied from the
//!   highest-priority member that has it; otherwise occurrences are unioned
//!   and exact duplicates (tag, indicators and subfields) dropped;
//! - local-use tags (9xx) only with `keep9xx`;
//! - provenance, holdings and merge-note fields naming every contributor.

use crate::cluster::Cluster;
use crate::config::RunConfig;
use crate::record::{is_local_use_tag, Field, Record};
use crate::source::{RecordId, SourceRecord};
use lazy_static::lazy_static;
use rayon::prelude::*;
use regex::Regex;
use serde::Serialize;
use std::collections::{BTreeSet, HashMap, HashSet};

lazy_static! {
    /// Authority-link patterns in `$9`, with their weight.
    static ref AUTHORITY_LINKS: Vec<(Regex, u32)> = vec![
        (Regex::new(r"^(viaf:? *\d+|\d{8})$").unwrap(), 6),
        (Regex::new(r"^isni:? *\d{15}[0-9x]$").unwrap(), 6),
        (Regex::new(r"^(wd|wikidata):q\d+$").unwrap(), 5),
        (Regex::new(r"^(bne|lemac|cantic):.+$").unwrap(), 4),
    ];
}

const UNKNOWN_AUTHORITY_LINK: u32 = 2;

/// One contributing record, as listed in the manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Contributor {
    /// Source label
    pub source: String,
    /// Identifier of the record in its source catalog
    pub record_id: String,
    /// Position of the record within its source
    pub position: usize,
}

impl Contributor {
    fn from_source_record(member: &SourceRecord) -> Self {
        Contributor {
            source: member.label.clone(),
            record_id: member.local_id.clone(),
            position: member.id.position,
        }
    }
}

/// The union record of one cluster.
#[derive(Debug, Clone)]
pub struct MergedRecord {
    /// Id of the cluster it represents
    pub cluster_id: usize,
    /// Member used as the base record
    pub primary: RecordId,
    /// Synthesized record
    pub record: Record,
    /// Contributors in priority order
    pub contributors: Vec<Contributor>,
}

impl MergedRecord {
    /// Distinct contributing source labels, sorted.
    #[must_use]
    pub fn libraries(&self) -> Vec<&str> {
        self.contributors
            .iter()
            .map(|c| c.source.as_str())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}

/// Completeness of a record, used to choose the primary member.
///
/// Points for the descriptive core (245, 260/264, 1xx, 020, 022, 300, a full
/// 008), one per non-blank indicator, and per `$9` authority link in 1xx,
/// 6xx and 7xx fields.
#[must_use]
pub fn completeness_score(record: &Record) -> u32 {
    let mut score = 0;

    if record.has_tag("245") {
        score += 15;
    }
    if record.has_tag("260") || record.has_tag("264") {
        score += 10;
    }
    if ["100", "110", "111"].iter().any(|t| record.has_tag(t)) {
        score += 8;
    }
    if record.has_tag("020") {
        score += 12;
    }
    if record.has_tag("022") {
        score += 10;
    }
    if record.has_tag("300") {
        score += 4;
    }
    if record
        .get_control_field("008")
        .is_some_and(|f| f.chars().count() >= 40)
    {
        score += 15;
    }

    for field in record.fields() {
        score += u32::from(field.indicator1 != ' ') + u32::from(field.indicator2 != ' ');
        if carries_authority_links(&field.tag) {
            score += field
                .subfields_by_code('9')
                .map(authority_link_score)
                .sum::<u32>();
        }
    }

    score
}

fn carries_authority_links(tag: &str) -> bool {
    matches!(tag.parse::<u16>(), Ok(100..=111 | 600..=799))
}

fn authority_link_score(value: &str) -> u32 {
    let value = value.trim().to_lowercase();
    AUTHORITY_LINKS
        .iter()
        .find(|(pattern, _)| pattern.is_match(&value))
        .map_or(UNKNOWN_AUTHORITY_LINK, |(_, weight)| *weight)
}

/// Most complete member; the earliest one wins a tie.
fn choose_primary<'a>(members: &[&'a SourceRecord]) -> Option<&'a SourceRecord> {
    let mut best: Option<(&SourceRecord, u32)> = None;
    for &member in members {
        let score = completeness_score(&member.record);
        if best.map_or(true, |(_, top)| score > top) {
            best = Some((member, score));
        }
    }
    best.map(|(member, _)| member)
}

/// Merge one cluster.
///
/// `records` is the run's full record list; cluster members index into it.
/// Returns `None` for a cluster without members.
///
/// # Panics
///
/// Panics if a member index is outside `records`.
#[must_use]
pub fn merge_cluster(
    cluster: &Cluster,
    records: &[SourceRecord],
    config: &RunConfig,
) -> Option<MergedRecord> {
    let mut members: Vec<&SourceRecord> = cluster.members.iter().map(|&i| &records[i]).collect();
    members.sort_by_key(|m| m.id);
    let primary = choose_primary(&members)?;

    // Primary first, then the rest in priority order
    let ordered: Vec<&SourceRecord> = std::iter::once(primary)
        .chain(members.iter().copied().filter(|m| m.id != primary.id))
        .collect();

    let mut record = Record::new(primary.record.leader.for_merged_record());

    for member in &ordered {
        for (tag, value) in member.record.control_fields_iter() {
            if record.get_control_field(tag).is_none() {
                record.add_control_field_str(tag, value);
            }
        }
    }

    // With prefer-fields, the first member by priority owning each tag
    let mut owners: HashMap<&str, RecordId> = HashMap::new();
    if config.prefer_fields() {
        for member in &members {
            for field in member.record.fields() {
                owners.entry(field.tag.as_str()).or_insert(member.id);
            }
        }
    }

    let mut seen: HashSet<&Field> = HashSet::new();
    for member in &ordered {
        for field in member.record.fields() {
            if !config.keep9xx() && is_local_use_tag(&field.tag) {
                continue;
            }
            let keep = if config.prefer_fields() {
                owners.get(field.tag.as_str()) == Some(&member.id)
            } else {
                seen.insert(field)
            };
            if keep {
                record.add_field(field.clone());
            }
        }
    }

    add_provenance(&mut record, &members, config);

    Some(MergedRecord {
        cluster_id: cluster.id,
        primary: primary.id,
        record,
        contributors: members
            .iter()
            .map(|m| Contributor::from_source_record(m))
            .collect(),
    })
}

fn add_provenance(record: &mut Record, members: &[&SourceRecord], config: &RunConfig) {
    let mut present: HashSet<String> = record
        .fields_by_tag(config.provenance_tag())
        .filter_map(|f| f.get_subfield('a'))
        .map(str::to_string)
        .collect();

    for member in members {
        let provenance = format!("({}){}", member.label, member.local_id);
        if present.insert(provenance.clone()) {
            record.add_field(
                Field::builder(config.provenance_tag().to_string(), ' ', ' ')
                    .subfield('a', provenance)
                    .build(),
            );
        }

        record.add_field(
            Field::builder(config.holdings_tag().to_string(), ' ', ' ')
                .subfield_str('a', &member.label)
                .subfield_str('b', &member.local_id)
                .build(),
        );
    }

    let libraries: BTreeSet<&str> = members.iter().map(|m| m.label.as_str()).collect();
    let note = format!(
        "Union record of {} records. Libraries: {}",
        members.len(),
        libraries.into_iter().collect::<Vec<_>>().join(", ")
    );
    record.add_field(
        Field::builder(config.merge_note_tag().to_string(), ' ', ' ')
            .subfield('a', note)
            .build(),
    );
}

/// Merge every cluster in parallel; output follows cluster order.
#[must_use]
pub fn merge_all(
    clusters: &[Cluster],
    records: &[SourceRecord],
    config: &RunConfig,
) -> Vec<MergedRecord> {
    clusters
        .par_iter()
        .filter_map(|cluster| merge_cluster(cluster, records, config))
        .collect()
}
