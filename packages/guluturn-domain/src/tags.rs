use std::{
	collections::{BTreeSet, HashMap},
	fs,
	path::Path,
};

use serde::{Deserialize, Serialize};

use crate::{Error, Result, models::Polarity};

/// Tag the parser emits when the user says a named place is closed.
pub const USER_REPORT_CLOSED: &str = "user_report_closed";

static NO_OPPOSITES: BTreeSet<String> = BTreeSet::new();

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TagCategory {
	Preference,
	Quality,
	Safety,
	System,
}
impl TagCategory {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Preference => "preference",
			Self::Quality => "quality",
			Self::Safety => "safety",
			Self::System => "system",
		}
	}
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TagStrength {
	Hard,
	Soft,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TagMetadata {
	pub name: String,
	pub category: TagCategory,
	pub polarity: Polarity,
	pub strength: TagStrength,
	pub opposite_tags: BTreeSet<String>,
	pub description: String,
}
impl TagMetadata {
	pub fn is_hard(&self) -> bool {
		self.strength == TagStrength::Hard
	}
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct TaxonomyFile {
	#[serde(default)]
	preference: Vec<TaxonomyEntry>,
	#[serde(default)]
	quality: Vec<TaxonomyEntry>,
	#[serde(default)]
	safety: Vec<TaxonomyEntry>,
	#[serde(default)]
	system: Vec<TaxonomyEntry>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct TaxonomyEntry {
	tag: String,
	polarity: Polarity,
	strength: TagStrength,
	#[serde(default)]
	opposite: Vec<String>,
	#[serde(default)]
	description: String,
}

/// Immutable tag lookup. Build once, then share by reference or `Arc`.
///
/// Lookups of unknown tag names return `None` or `false`; callers treat such tags as absent.
#[derive(Clone, Debug)]
pub struct TagRegistry {
	tags: HashMap<String, TagMetadata>,
}
impl TagRegistry {
	pub fn load(path: &Path) -> Result<Self> {
		let raw = fs::read_to_string(path)
			.map_err(|err| Error::ReadTaxonomy { path: path.to_path_buf(), source: err })?;

		Self::from_toml_str(&raw)
	}

	pub fn from_toml_str(raw: &str) -> Result<Self> {
		let file: TaxonomyFile =
			toml::from_str(raw).map_err(|err| Error::ParseTaxonomy { source: err })?;
		let mut tags = HashMap::new();

		for (category, entries) in [
			(TagCategory::Preference, file.preference),
			(TagCategory::Quality, file.quality),
			(TagCategory::Safety, file.safety),
			(TagCategory::System, file.system),
		] {
			for entry in entries {
				let name = entry.tag.trim().to_string();

				if name.is_empty() {
					return Err(invalid(format!("Empty tag name in {} section.", category.as_str())));
				}

				let metadata = TagMetadata {
					name: name.clone(),
					category,
					polarity: entry.polarity,
					strength: entry.strength,
					opposite_tags: entry.opposite.iter().map(|tag| tag.trim().to_string()).collect(),
					description: entry.description,
				};

				if tags.insert(name.clone(), metadata).is_some() {
					return Err(invalid(format!("Duplicate tag {name}.")));
				}
			}
		}

		if tags.is_empty() {
			return Err(invalid("Taxonomy defines no tags.".to_string()));
		}

		link_opposites(&mut tags)?;

		Ok(Self { tags })
	}

	pub fn get(&self, tag: &str) -> Option<&TagMetadata> {
		self.tags.get(tag)
	}

	pub fn contains(&self, tag: &str) -> bool {
		self.tags.contains_key(tag)
	}

	pub fn len(&self) -> usize {
		self.tags.len()
	}

	pub fn is_empty(&self) -> bool {
		self.tags.is_empty()
	}

	pub fn is_hard_negative(&self, tag: &str) -> bool {
		self.get(tag).is_some_and(|meta| meta.is_hard() && meta.polarity == Polarity::Negative)
	}

	pub fn is_hard_positive(&self, tag: &str) -> bool {
		self.get(tag).is_some_and(|meta| meta.is_hard() && meta.polarity == Polarity::Positive)
	}

	pub fn is_hard(&self, tag: &str) -> bool {
		self.get(tag).is_some_and(TagMetadata::is_hard)
	}

	pub fn opposite_tags(&self, tag: &str) -> &BTreeSet<String> {
		self.get(tag).map(|meta| &meta.opposite_tags).unwrap_or(&NO_OPPOSITES)
	}

	pub fn are_opposites(&self, lhs: &str, rhs: &str) -> bool {
		self.opposite_tags(lhs).contains(rhs)
	}

	/// Sorted tag vocabulary, e.g. for building parser prompts.
	pub fn tag_names(&self) -> Vec<&str> {
		let mut names: Vec<&str> = self.tags.keys().map(String::as_str).collect();

		names.sort_unstable();

		names
	}
}

fn link_opposites(tags: &mut HashMap<String, TagMetadata>) -> Result<()> {
	let mut pairs = Vec::new();

	for (name, meta) in tags.iter() {
		for opposite in &meta.opposite_tags {
			if opposite == name {
				return Err(invalid(format!("Tag {name} lists itself as an opposite.")));
			}
			if !tags.contains_key(opposite) {
				return Err(invalid(format!("Tag {name} lists unknown opposite {opposite}.")));
			}

			pairs.push((opposite.clone(), name.clone()));
		}

		let mirrored = if let Some(topic) = name.strip_prefix("prefer_") {
			Some(format!("avoid_{topic}"))
		} else {
			name.strip_prefix("avoid_").map(|topic| format!("prefer_{topic}"))
		};

		if let Some(mirrored) = mirrored
			&& tags.contains_key(&mirrored)
		{
			pairs.push((name.clone(), mirrored));
		}
	}

	for (name, opposite) in pairs {
		if let Some(meta) = tags.get_mut(&name) {
			meta.opposite_tags.insert(opposite);
		}
	}

	Ok(())
}

fn invalid(message: String) -> Error {
	Error::InvalidTaxonomy { message }
}
