use crate::models::{AdType, SiteSettings};
use mongodb::bson::{doc, Document};
use serde::Deserialize;

const MAX_SITE_NAME: usize = 100;
const MAX_FOOTER_CONTENT: usize = 5000;
const MAX_ADSENSE_ID: usize = 50;

/// Partial settings update. Absent fields keep their stored value.
#[derive(Debug, Deserialize, Default, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SettingsPatch {
    pub site_name: Option<String>,
    pub logo: Option<String>,
    pub favicon: Option<String>,
    pub enable_user_auth: Option<bool>,
    pub enable_secondary_footer: Option<bool>,
    pub secondary_footer_content: Option<String>,
    pub enable_ads: Option<bool>,
    pub ad_type: Option<AdType>,
    pub google_ad_sense_id: Option<String>,
    pub custom_ad_image: Option<String>,
    pub custom_ad_link: Option<String>,
}

fn trimmed(value: &Option<String>) -> Option<String> {
    value.as_ref().map(|s| s.trim().to_string())
}

impl SettingsPatch {
    /// Trims string fields and checks length limits.
    pub fn normalize(self) -> Result<Self, String> {
        let patch = SettingsPatch {
            site_name: trimmed(&self.site_name),
            logo: trimmed(&self.logo),
            favicon: trimmed(&self.favicon),
            secondary_footer_content: trimmed(&self.secondary_footer_content),
            google_ad_sense_id: trimmed(&self.google_ad_sense_id),
            custom_ad_image: trimmed(&self.custom_ad_image),
            custom_ad_link: trimmed(&self.custom_ad_link),
            ..self
        };

        let too_long = |value: &Option<String>, max: usize| {
            value.as_ref().map_or(false, |s| s.chars().count() > max)
        };
        if too_long(&patch.site_name, MAX_SITE_NAME) {
            return Err(format!("Site name must be at most {} characters", MAX_SITE_NAME));
        }
        if too_long(&patch.secondary_footer_content, MAX_FOOTER_CONTENT) {
            return Err(format!(
                "Secondary footer content must be at most {} characters",
                MAX_FOOTER_CONTENT
            ));
        }
        if too_long(&patch.google_ad_sense_id, MAX_ADSENSE_ID) {
            return Err(format!(
                "Google AdSense ID must be at most {} characters",
                MAX_ADSENSE_ID
            ));
        }
        Ok(patch)
    }

    pub fn is_empty(&self) -> bool {
        *self == SettingsPatch::default()
    }

    pub fn apply(&self, settings: &mut SiteSettings) {
        macro_rules! merge {
            ($($field:ident),*) => {
                $(if let Some(value) = &self.$field {
                    settings.$field = value.clone();
                })*
            };
        }
        merge!(
            site_name,
            logo,
            favicon,
            enable_user_auth,
            enable_secondary_footer,
            secondary_footer_content,
            enable_ads,
            ad_type,
            google_ad_sense_id,
            custom_ad_image,
            custom_ad_link
        );
    }

    /// `$set` body holding only the fields present in the patch.
    pub fn to_set_document(&self) -> Document {
        let mut set = Document::new();
        macro_rules! put {
            ($($field:ident => $key:literal),*) => {
                $(if let Some(value) = &self.$field {
                    set.insert($key, value.clone());
                })*
            };
        }
        put!(
            site_name => "siteName",
            logo => "logo",
            favicon => "favicon",
            enable_user_auth => "enableUserAuth",
            enable_secondary_footer => "enableSecondaryFooter",
            secondary_footer_content => "secondaryFooterContent",
            enable_ads => "enableAds",
            google_ad_sense_id => "googleAdSenseId",
            custom_ad_image => "customAdImage",
            custom_ad_link => "customAdLink"
        );
        if let Some(ad_type) = self.ad_type {
            set.insert("adType", ad_type.as_str());
        }
        set
    }
}

/// Full replacement used by reset: every field back to its default.
pub fn defaults_document() -> Document {
    let defaults = SiteSettings::default();
    doc! {
        "siteName": defaults.site_name,
        "logo": defaults.logo,
        "favicon": defaults.favicon,
        "enableUserAuth": defaults.enable_user_auth,
        "enableSecondaryFooter": defaults.enable_secondary_footer,
        "secondaryFooterContent": defaults.secondary_footer_content,
        "enableAds": defaults.enable_ads,
        "adType": defaults.ad_type.as_str(),
        "googleAdSenseId": defaults.google_ad_sense_id,
        "customAdImage": defaults.custom_ad_image,
        "customAdLink": defaults.custom_ad_link,
    }
}
