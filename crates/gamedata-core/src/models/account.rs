use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::decode::{optional, required, Decode, Schema};
use crate::error::ValidationError;

use super::enka::{avatar_info_schema, player_info_schema, ApiAvatarInfo, ApiPlayerInfo};
use super::{CharacterDetail, PlayerDetail};

/// A game account linked to an Enka.Network profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnkaAccount {
    pub hash: String,
    /// Hidden unless the owner made it public.
    pub uid: Option<u64>,
    pub uid_public: bool,
    pub is_public: bool,
    pub verified: bool,
    pub region: Option<String>,
    pub order: i64,
    pub player: Option<PlayerDetail>,
}

/// A saved character build on an Enka.Network profile.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnkaBuild {
    pub id: u64,
    pub name: String,
    pub avatar_id: u64,
    pub order: i64,
    /// The build currently shown in the live showcase.
    pub live: bool,
    pub is_public: bool,
    pub image: Option<String>,
    pub character: Option<CharacterDetail>,
}

// Internal API response types

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ApiAccount {
    pub hash: String,
    #[serde(default)]
    pub uid: Option<u64>,
    #[serde(default)]
    pub uid_public: bool,
    #[serde(default)]
    pub public: bool,
    #[serde(default)]
    pub verified: bool,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub order: i64,
    #[serde(default)]
    pub player_info: Option<ApiPlayerInfo>,
}

fn account_schema() -> Schema {
    Schema::object([
        required("hash", Schema::String),
        optional("uid", Schema::nullable(Schema::Unsigned)),
        optional("uid_public", Schema::Bool),
        optional("public", Schema::Bool),
        optional("verified", Schema::Bool),
        optional("region", Schema::nullable(Schema::String)),
        optional("order", Schema::Integer),
        optional("player_info", Schema::nullable(player_info_schema())),
    ])
}

impl Decode for ApiAccount {
    fn schema() -> Schema {
        account_schema()
    }
}

/// `/hoyos/` answers with an object keyed by account hash.
#[derive(Debug, Clone, Deserialize)]
#[serde(transparent)]
pub(crate) struct ApiAccounts(pub BTreeMap<String, ApiAccount>);

impl Decode for ApiAccounts {
    fn schema() -> Schema {
        Schema::map(account_schema())
    }
}

impl ApiAccount {
    pub(crate) fn into_account(self) -> EnkaAccount {
        EnkaAccount {
            player: self.player_info.as_ref().map(ApiPlayerInfo::to_player_detail),
            hash: self.hash,
            uid: self.uid,
            uid_public: self.uid_public,
            is_public: self.public,
            verified: self.verified,
            region: self.region,
            order: self.order,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ApiBuild {
    pub id: u64,
    #[serde(default)]
    pub name: String,
    pub avatar_id: String,
    #[serde(default)]
    pub order: i64,
    #[serde(default)]
    pub live: bool,
    #[serde(default)]
    pub public: bool,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub avatar_data: Option<ApiAvatarInfo>,
}

/// `/builds/` answers with an object keyed by avatar id, each a list of builds.
#[derive(Debug, Clone, Deserialize)]
#[serde(transparent)]
pub(crate) struct ApiBuilds(pub BTreeMap<String, Vec<ApiBuild>>);

impl Decode for ApiBuilds {
    fn schema() -> Schema {
        Schema::map(Schema::array(Schema::object([
            required("id", Schema::Unsigned),
            optional("name", Schema::String),
            required("avatar_id", Schema::String),
            optional("order", Schema::Integer),
            optional("live", Schema::Bool),
            optional("public", Schema::Bool),
            optional("image", Schema::nullable(Schema::String)),
            optional("avatar_data", Schema::nullable(avatar_info_schema())),
        ])))
    }
}

impl ApiBuilds {
    /// Flatten into builds ordered by avatar id, then by display order.
    pub(crate) fn into_builds(self) -> Result<Vec<EnkaBuild>, ValidationError> {
        let mut builds = Vec::new();
        for (key, entries) in self.0 {
            for (i, build) in entries.into_iter().enumerate() {
                let path = format!("$[{:?}][{}]", key, i);
                let avatar_id = build.avatar_id.parse::<u64>().map_err(|_| {
                    ValidationError::new(
                        format!("{}.avatar_id", path),
                        "numeric string",
                        format!("string {:?}", build.avatar_id),
                    )
                })?;
                let character = build
                    .avatar_data
                    .as_ref()
                    .map(|data| data.to_character_detail(&format!("{}.avatar_data", path)))
                    .transpose()?;

                builds.push(EnkaBuild {
                    id: build.id,
                    name: build.name,
                    avatar_id,
                    order: build.order,
                    live: build.live,
                    is_public: build.public,
                    image: build.image,
                    character,
                });
            }
        }
        builds.sort_by_key(|b| (b.avatar_id, b.order));
        Ok(builds)
    }
}
