use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::decode::{optional, required, Decode, Schema};
use crate::error::ValidationError;

/// `propMap` key holding the character level
const PROP_LEVEL: &str = "4001";

/// `propMap` key holding the ascension phase
const PROP_ASCENSION: &str = "1002";

// ============================================================================
// Domain types
// ============================================================================

/// One decoded `/api/uid/{uid}` snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnkaData {
    pub uid: u64,
    pub player: PlayerDetail,
    /// Empty when the player hides character details.
    pub characters: Vec<CharacterDetail>,
    pub ttl_seconds: u64,
    pub owner: Option<EnkaOwner>,
    pub fetched_at: DateTime<Utc>,
    pub next_showcase_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlayerDetail {
    pub nickname: String,
    pub level: u32,
    pub signature: Option<String>,
    pub world_level: Option<u32>,
    pub name_card_id: Option<u64>,
    pub achievement_count: Option<u32>,
    pub abyss_floor: Option<u32>,
    pub abyss_chamber: Option<u32>,
    pub showcase: Vec<ShowcaseEntry>,
    pub profile_picture_id: Option<u64>,
}

impl PlayerDetail {
    /// Spiral Abyss progress as "floor-chamber", if the player has any.
    pub fn abyss_display(&self) -> Option<String> {
        match (self.abyss_floor, self.abyss_chamber) {
            (Some(floor), Some(chamber)) => Some(format!("{}-{}", floor, chamber)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShowcaseEntry {
    pub avatar_id: u64,
    pub level: u32,
    pub costume_id: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CharacterDetail {
    pub avatar_id: u64,
    pub level: u32,
    pub ascension: u32,
    /// Traveler has no friendship level.
    pub friendship: Option<u32>,
    pub constellation: u32,
    pub skill_levels: BTreeMap<u64, u32>,
    pub fight_props: BTreeMap<u32, f64>,
    pub equipment_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnkaOwner {
    pub hash: String,
    pub username: String,
}

// ============================================================================
// API response types
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ApiEnkaData {
    #[serde(rename = "playerInfo")]
    pub player_info: ApiPlayerInfo,
    #[serde(rename = "avatarInfoList", default)]
    pub avatar_info_list: Option<Vec<ApiAvatarInfo>>,
    #[serde(default)]
    pub ttl: Option<u64>,
    #[serde(default)]
    pub uid: Option<String>,
    #[serde(default)]
    pub owner: Option<ApiOwner>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ApiPlayerInfo {
    pub nickname: String,
    pub level: u32,
    #[serde(default)]
    pub signature: Option<String>,
    #[serde(rename = "worldLevel", default)]
    pub world_level: Option<u32>,
    #[serde(rename = "nameCardId", default)]
    pub name_card_id: Option<u64>,
    #[serde(rename = "finishAchievementNum", default)]
    pub finish_achievement_num: Option<u32>,
    #[serde(rename = "towerFloorIndex", default)]
    pub tower_floor_index: Option<u32>,
    #[serde(rename = "towerLevelIndex", default)]
    pub tower_level_index: Option<u32>,
    #[serde(rename = "showAvatarInfoList", default)]
    pub show_avatar_info_list: Option<Vec<ApiShowAvatarInfo>>,
    #[serde(rename = "profilePicture", default)]
    pub profile_picture: Option<ApiProfilePicture>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ApiShowAvatarInfo {
    #[serde(rename = "avatarId")]
    pub avatar_id: u64,
    pub level: u32,
    #[serde(rename = "costumeId", default)]
    pub costume_id: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ApiProfilePicture {
    #[serde(default)]
    pub id: Option<u64>,
    #[serde(rename = "avatarId", default)]
    pub avatar_id: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ApiAvatarInfo {
    #[serde(rename = "avatarId")]
    pub avatar_id: u64,
    #[serde(rename = "propMap", default)]
    pub prop_map: HashMap<String, ApiProp>,
    #[serde(rename = "fightPropMap", default)]
    pub fight_prop_map: HashMap<String, f64>,
    #[serde(rename = "skillLevelMap", default)]
    pub skill_level_map: HashMap<String, u32>,
    #[serde(rename = "talentIdList", default)]
    pub talent_id_list: Vec<u64>,
    #[serde(rename = "equipList", default)]
    pub equip_list: Vec<serde_json::Value>,
    #[serde(rename = "fetterInfo", default)]
    pub fetter_info: Option<ApiFetterInfo>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ApiProp {
    #[serde(default)]
    pub val: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ApiFetterInfo {
    #[serde(rename = "expLevel", default)]
    pub exp_level: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ApiOwner {
    pub hash: String,
    pub username: String,
}

pub(crate) fn player_info_schema() -> Schema {
    Schema::object([
        required("nickname", Schema::String),
        required("level", Schema::U32),
        optional("signature", Schema::nullable(Schema::String)),
        optional("worldLevel", Schema::U32),
        optional("nameCardId", Schema::Unsigned),
        optional("finishAchievementNum", Schema::U32),
        optional("towerFloorIndex", Schema::U32),
        optional("towerLevelIndex", Schema::U32),
        optional(
            "showAvatarInfoList",
            Schema::nullable(Schema::array(Schema::object([
                required("avatarId", Schema::Unsigned),
                required("level", Schema::U32),
                optional("costumeId", Schema::Unsigned),
            ]))),
        ),
        optional(
            "profilePicture",
            Schema::nullable(Schema::object([
                optional("id", Schema::Unsigned),
                optional("avatarId", Schema::Unsigned),
            ])),
        ),
    ])
}

pub(crate) fn avatar_info_schema() -> Schema {
    Schema::object([
        required("avatarId", Schema::Unsigned),
        optional(
            "propMap",
            Schema::map(Schema::object([optional("val", Schema::String)])),
        ),
        optional("fightPropMap", Schema::map(Schema::Number)),
        optional("skillLevelMap", Schema::map(Schema::U32)),
        optional("talentIdList", Schema::array(Schema::Unsigned)),
        optional("equipList", Schema::array(Schema::Any)),
        optional(
            "fetterInfo",
            Schema::nullable(Schema::object([optional("expLevel", Schema::U32)])),
        ),
    ])
}

impl Decode for ApiEnkaData {
    fn schema() -> Schema {
        Schema::object([
            required("playerInfo", player_info_schema()),
            optional("avatarInfoList", Schema::nullable(Schema::array(avatar_info_schema()))),
            optional("ttl", Schema::Unsigned),
            optional("uid", Schema::String),
            optional(
                "owner",
                Schema::nullable(Schema::object([
                    required("hash", Schema::String),
                    required("username", Schema::String),
                ])),
            ),
        ])
    }
}

impl ApiPlayerInfo {
    pub(crate) fn to_player_detail(&self) -> PlayerDetail {
        PlayerDetail {
            nickname: self.nickname.clone(),
            level: self.level,
            signature: self.signature.clone(),
            world_level: self.world_level,
            name_card_id: self.name_card_id,
            achievement_count: self.finish_achievement_num,
            abyss_floor: self.tower_floor_index,
            abyss_chamber: self.tower_level_index,
            showcase: self
                .show_avatar_info_list
                .iter()
                .flatten()
                .map(|a| ShowcaseEntry {
                    avatar_id: a.avatar_id,
                    level: a.level,
                    costume_id: a.costume_id,
                })
                .collect(),
            profile_picture_id: self
                .profile_picture
                .as_ref()
                .and_then(|p| p.id.or(p.avatar_id)),
        }
    }
}

impl ApiAvatarInfo {
    /// `path` locates this avatar in the payload for error reporting.
    pub(crate) fn to_character_detail(&self, path: &str) -> Result<CharacterDetail, ValidationError> {
        let prop = |key: &str| -> Result<u32, ValidationError> {
            match self.prop_map.get(key).and_then(|p| p.val.as_deref()) {
                None => Ok(0),
                Some(raw) => raw.parse().map_err(|_| {
                    ValidationError::new(
                        format!("{}.propMap[{:?}].val", path, key),
                        "decimal integer string",
                        format!("string {:?}", raw),
                    )
                }),
            }
        };

        let skill_levels = parse_keys(&self.skill_level_map, &format!("{}.skillLevelMap", path))?;
        let fight_props = parse_keys(&self.fight_prop_map, &format!("{}.fightPropMap", path))?;

        Ok(CharacterDetail {
            avatar_id: self.avatar_id,
            level: prop(PROP_LEVEL)?,
            ascension: prop(PROP_ASCENSION)?,
            friendship: self.fetter_info.as_ref().and_then(|f| f.exp_level),
            constellation: self.talent_id_list.len() as u32,
            skill_levels,
            fight_props,
            equipment_count: self.equip_list.len(),
        })
    }
}

/// Convert a JSON object keyed by numeric strings into an ordered map.
fn parse_keys<K, V>(map: &HashMap<String, V>, path: &str) -> Result<BTreeMap<K, V>, ValidationError>
where
    K: std::str::FromStr + Ord,
    V: Copy,
{
    map.iter()
        .map(|(key, value)| {
            key.parse::<K>().map(|k| (k, *value)).map_err(|_| {
                ValidationError::new(
                    format!("{}[{:?}]", path, key),
                    "numeric key",
                    format!("key {:?}", key),
                )
            })
        })
        .collect()
}

impl ApiEnkaData {
    /// Build the domain snapshot. `ttl_seconds` is the effective TTL chosen
    /// by the caller (server hint clamped to the configured minimum).
    pub(crate) fn into_enka_data(
        self,
        uid: u64,
        ttl_seconds: u64,
        fetched_at: DateTime<Utc>,
    ) -> Result<EnkaData, ValidationError> {
        let characters = self
            .avatar_info_list
            .iter()
            .flatten()
            .enumerate()
            .map(|(i, avatar)| avatar.to_character_detail(&format!("$.avatarInfoList[{}]", i)))
            .collect::<Result<Vec<_>, _>>()?;

        let next_showcase_at = i64::try_from(ttl_seconds)
            .ok()
            .and_then(chrono::Duration::try_seconds)
            .and_then(|ttl| fetched_at.checked_add_signed(ttl))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);

        Ok(EnkaData {
            uid,
            player: self.player_info.to_player_detail(),
            characters,
            ttl_seconds,
            owner: self.owner.map(|o| EnkaOwner {
                hash: o.hash,
                username: o.username,
            }),
            fetched_at,
            next_showcase_at,
        })
    }
}
