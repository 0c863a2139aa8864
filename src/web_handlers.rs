use crate::auth;
use crate::catalog::{PageRequest, PlaybackKind, VideoFilter};
use crate::dto::{CatalogParams, SearchParams, SettingsResponse, VideoResponse};
use crate::error::{ApiError, Context};
use crate::models::{AdType, SiteSettings, Video};
use crate::store::Store;
use crate::template::{render, TERA};
use actix_web::http::header::LOCATION;
use actix_web::{web, HttpRequest, HttpResponse};
use serde::Serialize;
use std::collections::BTreeMap;

const ROW_LIMIT: u64 = 10;
const HERO_LIMIT: u64 = 5;
const UNIVERSE_SCAN: u64 = 100;
const MIN_UNIVERSE_SIZE: usize = 3;
const HOME_GENRES: [&str; 4] = ["Action", "Adventure", "Sci-Fi", "Fantasy"];
const BROWSE_GENRES: [&str; 6] = ["Action", "Comedy", "Drama", "Horror", "Sci-Fi", "Thriller"];
const BROWSE_LANGUAGES: [&str; 6] = ["English", "Spanish", "French", "German", "Japanese", "Korean"];

#[derive(Serialize)]
struct AdSlot {
    kind: &'static str,
    adsense_id: String,
    image: String,
    link: String,
}

#[derive(Serialize)]
struct Row {
    title: String,
    videos: Vec<VideoResponse>,
}

#[derive(Serialize)]
struct PageLink {
    number: u64,
    href: String,
    current: bool,
}

/// Secondary footer as HTML: escaped text with line breaks kept.
pub fn footer_html(settings: &SiteSettings) -> Option<String> {
    if !settings.enable_secondary_footer || settings.secondary_footer_content.is_empty() {
        return None;
    }
    let escaped = html_escape::encode_text(&settings.secondary_footer_content);
    Some(escaped.replace("\r\n", "\n").replace('\n', "<br>"))
}

fn ad_slot(settings: &SiteSettings) -> Option<AdSlot> {
    if !settings.enable_ads {
        return None;
    }
    match settings.ad_type {
        AdType::Google if !settings.google_ad_sense_id.is_empty() => Some(AdSlot {
            kind: "google",
            adsense_id: settings.google_ad_sense_id.clone(),
            image: String::new(),
            link: String::new(),
        }),
        AdType::Custom if !settings.custom_ad_image.is_empty() => Some(AdSlot {
            kind: "custom",
            adsense_id: String::new(),
            image: settings.custom_ad_image.clone(),
            link: settings.custom_ad_link.clone(),
        }),
        _ => None,
    }
}

// Everything the base layout reads. Settings are loaded per request.
async fn layout_context(req: &HttpRequest, store: &dyn Store) -> Result<tera::Context, ApiError> {
    let settings = store.load_settings().await.context("Failed to fetch settings")?;
    let mut context = tera::Context::new();
    context.insert("settings", &SettingsResponse::from(&settings));
    context.insert("footer_html", &footer_html(&settings));
    context.insert("ad", &ad_slot(&settings));
    context.insert("user_auth_enabled", &settings.enable_user_auth);

    let user_name = if settings.enable_user_auth {
        auth::current_user(req, store).await?.and_then(|s| s.name)
    } else {
        None
    };
    context.insert("user_name", &user_name);
    Ok(context)
}

fn responses(videos: Vec<Video>) -> Vec<VideoResponse> {
    videos.into_iter().map(VideoResponse::from).collect()
}

async fn row(store: &dyn Store, title: &str, filter: VideoFilter, limit: u64) -> Result<Row, ApiError> {
    let (videos, _) = store
        .list_videos(&filter, PageRequest::first(limit))
        .await
        .context("Failed to fetch videos")?;
    Ok(Row {
        title: title.to_string(),
        videos: responses(videos),
    })
}

/// Universes with enough titles to fill a row, alphabetical.
fn universe_rows(videos: &[Video]) -> Vec<Row> {
    let mut groups: BTreeMap<&str, Vec<VideoResponse>> = BTreeMap::new();
    for video in videos {
        if let Some(universe) = video.universe.as_deref().filter(|u| !u.is_empty()) {
            groups
                .entry(universe)
                .or_default()
                .push(VideoResponse::from(video.clone()));
        }
    }
    groups
        .into_iter()
        .filter(|(_, videos)| videos.len() >= MIN_UNIVERSE_SIZE)
        .map(|(universe, videos)| Row {
            title: format!("{} Universe", universe),
            videos,
        })
        .collect()
}

fn redirect(to: &str) -> HttpResponse {
    HttpResponse::Found().insert_header((LOCATION, to)).finish()
}

fn not_found(mut context: tera::Context, message: &str) -> Result<HttpResponse, ApiError> {
    context.insert("message", message);
    let html = TERA
        .render("not_found.html", &context)
        .map_err(|e| ApiError::internal("Failed to render page", e))?;
    Ok(HttpResponse::NotFound()
        .content_type("text/html; charset=utf-8")
        .body(html))
}

// GET /
pub async fn home_page(req: HttpRequest, store: web::Data<dyn Store>) -> Result<HttpResponse, ApiError> {
    let store = store.get_ref();
    let mut context = layout_context(&req, store).await?;

    let featured = row(store, "Featured", VideoFilter::featured(), HERO_LIMIT).await?;
    let mut rows = vec![
        row(store, "Trending Now", VideoFilter::trending(), ROW_LIMIT).await?,
        row(store, "Latest Releases", VideoFilter::default(), ROW_LIMIT).await?,
    ];
    for genre in HOME_GENRES {
        rows.push(row(store, genre, VideoFilter::genre(genre), ROW_LIMIT).await?);
    }
    rows.retain(|r| !r.videos.is_empty());

    let (recent, _) = store
        .list_videos(&VideoFilter::default(), PageRequest::first(UNIVERSE_SCAN))
        .await
        .context("Failed to fetch videos")?;

    context.insert("featured", &featured.videos);
    context.insert("rows", &rows);
    context.insert("universes", &universe_rows(&recent));
    render("index.html", &context)
}

fn page_href(base: &str, params: &[(&str, &Option<String>)], page: u64) -> String {
    let mut query: Vec<String> = params
        .iter()
        .filter_map(|(key, value)| {
            value
                .as_deref()
                .filter(|v| !v.is_empty())
                .map(|v| format!("{}={}", key, urlencoding::encode(v)))
        })
        .collect();
    query.push(format!("page={}", page));
    format!("{}?{}", base, query.join("&"))
}

fn page_links(base: &str, params: &[(&str, &Option<String>)], current: u64, pages: u64) -> Vec<PageLink> {
    (1..=pages)
        .map(|number| PageLink {
            number,
            href: page_href(base, params, number),
            current: number == current,
        })
        .collect()
}

// GET /browse
pub async fn browse_page(
    req: HttpRequest,
    store: web::Data<dyn Store>,
    params: web::Query<CatalogParams>,
) -> Result<HttpResponse, ApiError> {
    let store = store.get_ref();
    let mut context = layout_context(&req, store).await?;

    // A bad form value just drops that filter on the HTML page.
    let filter = VideoFilter::from_params(&params).unwrap_or_else(|e| {
        log::debug!("browse filter ignored: {}", e);
        VideoFilter::default()
    });
    let page = PageRequest::parse(&params.page, &params.limit).unwrap_or_else(|_| PageRequest::new(None, None));

    let (videos, total) = store
        .list_videos(&filter, page)
        .await
        .context("Failed to fetch videos")?;
    let categories = store
        .list_categories()
        .await
        .context("Failed to fetch categories")?;
    let pagination = page.pagination(total);

    let kept = [
        ("category", &params.category),
        ("genre", &params.genre),
        ("language", &params.language),
        ("year", &params.year),
        ("limit", &params.limit),
    ];
    context.insert("videos", &responses(videos));
    context.insert("pagination", &pagination);
    context.insert("page_links", &page_links("/browse", &kept, pagination.page, pagination.pages));
    context.insert(
        "category_names",
        &categories.into_iter().map(|c| c.name).collect::<Vec<_>>(),
    );
    context.insert("genres", &BROWSE_GENRES);
    context.insert("languages", &BROWSE_LANGUAGES);
    context.insert("selected_genre", &filter.genre);
    context.insert("selected_language", &filter.language);
    context.insert("selected_category", &filter.category);
    context.insert("selected_year", &filter.year);
    render("browse.html", &context)
}

// GET /search?q=
pub async fn search_page(
    req: HttpRequest,
    store: web::Data<dyn Store>,
    params: web::Query<SearchParams>,
) -> Result<HttpResponse, ApiError> {
    let store = store.get_ref();
    let mut context = layout_context(&req, store).await?;
    let query = params.q.as_deref().map(str::trim).unwrap_or_default().to_string();
    let page = PageRequest::parse(&params.page, &params.limit).unwrap_or_else(|_| PageRequest::new(None, None));

    let (videos, pagination) = if query.is_empty() {
        (Vec::new(), page.pagination(0))
    } else {
        let (videos, total) = store
            .search_videos(&query, page)
            .await
            .context("Search failed")?;
        (videos, page.pagination(total))
    };

    let q = Some(query.clone());
    context.insert("query", &query);
    context.insert("videos", &responses(videos));
    context.insert("pagination", &pagination);
    context.insert(
        "page_links",
        &page_links("/search", &[("q", &q)], pagination.page, pagination.pages),
    );
    render("search.html", &context)
}

// GET /watch/{id}: counts a view like /api/stream
pub async fn watch_page(
    req: HttpRequest,
    store: web::Data<dyn Store>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let store = store.get_ref();
    let mut context = layout_context(&req, store).await?;

    let id = match mongodb::bson::oid::ObjectId::parse_str(path.as_str()) {
        Ok(id) => id,
        Err(_) => return not_found(context, "Video not found"),
    };
    let video = match store.record_view(id).await.context("Failed to fetch video")? {
        Some(video) => video,
        None => return not_found(context, "Video not found"),
    };

    let embed = PlaybackKind::for_url(&video.video_url) == PlaybackKind::Embed;
    let (related, _) = match video.genres.first() {
        Some(genre) => store
            .list_videos(&VideoFilter::genre(genre), PageRequest::first(ROW_LIMIT + 1))
            .await
            .context("Failed to fetch videos")?,
        None => (Vec::new(), 0),
    };
    let related: Vec<Video> = related
        .into_iter()
        .filter(|v| v.id != video.id)
        .take(ROW_LIMIT as usize)
        .collect();

    context.insert("embed", &embed);
    context.insert("video", &VideoResponse::from(video));
    context.insert("related", &responses(related));
    render("watch.html", &context)
}

// GET /login
pub async fn login_page(req: HttpRequest, store: web::Data<dyn Store>) -> Result<HttpResponse, ApiError> {
    let context = layout_context(&req, store.get_ref()).await?;
    render("login.html", &context)
}

// GET /signup
pub async fn signup_page(req: HttpRequest, store: web::Data<dyn Store>) -> Result<HttpResponse, ApiError> {
    let context = layout_context(&req, store.get_ref()).await?;
    render("signup.html", &context)
}

// GET /admin
pub async fn admin_login_page(req: HttpRequest, store: web::Data<dyn Store>) -> Result<HttpResponse, ApiError> {
    let store = store.get_ref();
    if auth::check_admin(&req, store).await.is_ok() {
        return Ok(redirect("/admin/dashboard"));
    }
    let context = layout_context(&req, store).await?;
    render("admin/login.html", &context)
}

// GET /admin/dashboard
pub async fn admin_dashboard(req: HttpRequest, store: web::Data<dyn Store>) -> Result<HttpResponse, ApiError> {
    let store = store.get_ref();
    if auth::check_admin(&req, store).await.is_err() {
        return Ok(redirect("/admin"));
    }
    let mut context = layout_context(&req, store).await?;
    let settings = store.load_settings().await.context("Failed to fetch settings")?;
    context.insert("settings_json", &SettingsResponse::from(&settings));
    render("admin/dashboard.html", &context)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::SettingsPatch;
    use crate::test_support::{sample_video, test_app, TestContext};
    use actix_web::http::StatusCode;
    use actix_web::test::{call_service, read_body, TestRequest};

    async fn body_text<B: actix_web::body::MessageBody>(resp: actix_web::dev::ServiceResponse<B>) -> String {
        let bytes = read_body(resp).await;
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[test]
    fn footer_is_escaped_with_line_breaks() {
        let settings = SiteSettings {
            enable_secondary_footer: true,
            secondary_footer_content: "<b>Hi</b>\nLine two".to_string(),
            ..SiteSettings::default()
        };
        assert_eq!(
            footer_html(&settings).unwrap(),
            "&lt;b&gt;Hi&lt;/b&gt;<br>Line two"
        );

        let disabled = SiteSettings {
            enable_secondary_footer: false,
            ..settings
        };
        assert!(footer_html(&disabled).is_none());
    }

    #[test]
    fn ads_need_a_configured_creative() {
        let mut settings = SiteSettings {
            enable_ads: true,
            ad_type: AdType::Custom,
            ..SiteSettings::default()
        };
        assert!(ad_slot(&settings).is_none());
        settings.custom_ad_image = "https://ads/banner.png".to_string();
        assert_eq!(ad_slot(&settings).unwrap().kind, "custom");
        settings.enable_ads = false;
        assert!(ad_slot(&settings).is_none());
    }

    #[test]
    fn universes_need_three_titles() {
        let mut videos = Vec::new();
        for (title, universe) in [("A", "Marvel"), ("B", "Marvel"), ("C", "Marvel"), ("D", "DC")] {
            let mut v = sample_video(title, &["Action"]);
            v.universe = Some(universe.to_string());
            videos.push(v);
        }
        let rows = universe_rows(&videos);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].title, "Marvel Universe");
        assert_eq!(rows[0].videos.len(), 3);
    }

    #[test]
    fn pagination_links_keep_filters() {
        let genre = Some("Sci-Fi & Fantasy".to_string());
        let empty = Some(String::new());
        let links = page_links("/browse", &[("genre", &genre), ("year", &empty)], 2, 3);
        assert_eq!(links.len(), 3);
        assert_eq!(links[0].href, "/browse?genre=Sci-Fi%20%26%20Fantasy&page=1");
        assert!(links[1].current);
    }

    #[actix_web::test]
    async fn home_renders_site_name_and_rows() {
        let ctx = TestContext::new().await;
        let mut hit = sample_video("Night Runner", &["Action"]);
        hit.is_trending = true;
        ctx.store.insert_video(hit).await.unwrap();
        ctx.store.load_settings().await.unwrap();
        ctx.store
            .update_settings(&SettingsPatch {
                site_name: Some("Flix".into()),
                enable_secondary_footer: Some(true),
                secondary_footer_content: Some("<script>x</script>".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        let app = test_app!(ctx);

        let req = TestRequest::get().uri("/").to_request();
        let resp = call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let html = body_text(resp).await;
        assert!(html.contains("Flix"));
        assert!(html.contains("Trending Now"));
        assert!(html.contains("Night Runner"));
        assert!(html.contains("&lt;script&gt;"));
        assert!(!html.contains("<script>x</script>"));
    }

    #[actix_web::test]
    async fn watch_page_counts_a_view() {
        let ctx = TestContext::new().await;
        let video = ctx
            .store
            .insert_video(sample_video("Watched", &["Drama"]))
            .await
            .unwrap();
        let id = video.id.unwrap();
        let app = test_app!(ctx);

        let req = TestRequest::get()
            .uri(&format!("/watch/{}", id.to_hex()))
            .to_request();
        let resp = call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let html = body_text(resp).await;
        assert!(html.contains("<video"));
        assert_eq!(ctx.store.get_video(id).await.unwrap().unwrap().views, 1);

        let req = TestRequest::get().uri("/watch/nope").to_request();
        assert_eq!(
            call_service(&app, req).await.status(),
            StatusCode::NOT_FOUND
        );
    }

    #[actix_web::test]
    async fn browse_filters_and_search_page() {
        let ctx = TestContext::new().await;
        ctx.store.insert_video(sample_video("Laugh Track", &["Comedy"])).await.unwrap();
        ctx.store.insert_video(sample_video("Dark Alley", &["Thriller"])).await.unwrap();
        let app = test_app!(ctx);

        let req = TestRequest::get().uri("/browse?genre=Comedy&year=").to_request();
        let html = body_text(call_service(&app, req).await).await;
        assert!(html.contains("Laugh Track"));
        assert!(!html.contains("Dark Alley"));

        let req = TestRequest::get().uri("/search?q=alley").to_request();
        let html = body_text(call_service(&app, req).await).await;
        assert!(html.contains("Dark Alley"));
        assert!(!html.contains("Laugh Track"));
    }

    #[actix_web::test]
    async fn login_page_has_signup_confirmation() {
        let ctx = TestContext::new().await;
        ctx.store.load_settings().await.unwrap();
        ctx.store
            .update_settings(&SettingsPatch {
                enable_user_auth: Some(true),
                ..Default::default()
            })
            .await
            .unwrap();
        let app = test_app!(ctx);

        let req = TestRequest::get().uri("/login?registered=1").to_request();
        let html = body_text(call_service(&app, req).await).await;
        assert!(html.contains("registered-notice"));
        assert!(html.contains("Account created successfully! Please sign in."));
        assert!(html.contains("id=\"login-form\""));
    }

    #[actix_web::test]
    async fn dashboard_requires_admin_session() {
        let ctx = TestContext::new().await;
        let cookie = ctx.admin_cookie().await;
        let app = test_app!(ctx);

        let req = TestRequest::get().uri("/admin/dashboard").to_request();
        let resp = call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::FOUND);
        assert_eq!(resp.headers().get(LOCATION).unwrap(), "/admin");

        let req = TestRequest::get()
            .uri("/admin/dashboard")
            .cookie(cookie.clone())
            .to_request();
        assert_eq!(call_service(&app, req).await.status(), StatusCode::OK);

        let req = TestRequest::get().uri("/admin").cookie(cookie).to_request();
        let resp = call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::FOUND);
        assert_eq!(resp.headers().get(LOCATION).unwrap(), "/admin/dashboard");
    }
}
