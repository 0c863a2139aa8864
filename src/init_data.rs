use crate::error::StoreResult;
use crate::models::{Category, CategoryType, Video};
use crate::store::Store;
use mongodb::bson::DateTime;

struct SampleVideo {
    title: &'static str,
    description: &'static str,
    video_url: &'static str,
    duration: i32,
    year: i32,
    genres: &'static [&'static str],
    languages: &'static [&'static str],
    categories: &'static [&'static str],
    cast: &'static [&'static str],
    director: &'static str,
    rating: f64,
    is_trending: bool,
    is_featured: bool,
    quality: &'static [&'static str],
    views: i64,
}

const SAMPLE_BUCKET: &str = "https://commondatastorage.googleapis.com/gtv-videos-bucket/sample";

const SAMPLES: &[SampleVideo] = &[
    SampleVideo {
        title: "The Dark Knight",
        description: "When the menace known as the Joker wreaks havoc and chaos on the people of Gotham, Batman must accept one of the greatest psychological and physical tests of his ability to fight injustice.",
        video_url: "BigBuckBunny.mp4",
        duration: 152,
        year: 2008,
        genres: &["Action", "Crime", "Drama"],
        languages: &["English"],
        categories: &["Movies"],
        cast: &["Christian Bale", "Heath Ledger", "Aaron Eckhart"],
        director: "Christopher Nolan",
        rating: 9.0,
        is_trending: true,
        is_featured: true,
        quality: &["1080p", "4K"],
        views: 1_500_000,
    },
    SampleVideo {
        title: "Inception",
        description: "A thief who steals corporate secrets through the use of dream-sharing technology is given the inverse task of planting an idea into the mind of a C.E.O.",
        video_url: "ElephantsDream.mp4",
        duration: 148,
        year: 2010,
        genres: &["Action", "Sci-Fi", "Thriller"],
        languages: &["English"],
        categories: &["Movies"],
        cast: &["Leonardo DiCaprio", "Marion Cotillard", "Tom Hardy"],
        director: "Christopher Nolan",
        rating: 8.8,
        is_trending: false,
        is_featured: true,
        quality: &["1080p"],
        views: 1_200_000,
    },
    SampleVideo {
        title: "Interstellar",
        description: "A team of explorers travel through a wormhole in space in an attempt to ensure humanity's survival.",
        video_url: "ForBiggerBlazes.mp4",
        duration: 169,
        year: 2014,
        genres: &["Adventure", "Drama", "Sci-Fi"],
        languages: &["English"],
        categories: &["Movies"],
        cast: &["Matthew McConaughey", "Anne Hathaway", "Jessica Chastain"],
        director: "Christopher Nolan",
        rating: 8.6,
        is_trending: true,
        is_featured: true,
        quality: &["1080p", "4K"],
        views: 980_000,
    },
    SampleVideo {
        title: "Breaking Bad",
        description: "A high school chemistry teacher diagnosed with inoperable lung cancer turns to manufacturing and selling methamphetamine in order to secure his family's future.",
        video_url: "ForBiggerEscapes.mp4",
        duration: 47,
        year: 2008,
        genres: &["Crime", "Drama", "Thriller"],
        languages: &["English"],
        categories: &["Series"],
        cast: &["Bryan Cranston", "Aaron Paul", "Anna Gunn"],
        director: "Vince Gilligan",
        rating: 9.5,
        is_trending: true,
        is_featured: false,
        quality: &["1080p"],
        views: 2_100_000,
    },
    SampleVideo {
        title: "Stranger Things",
        description: "When a young boy disappears, his mother, a police chief and his friends must confront terrifying supernatural forces in order to get him back.",
        video_url: "ForBiggerFun.mp4",
        duration: 51,
        year: 2016,
        genres: &["Drama", "Fantasy", "Horror"],
        languages: &["English"],
        categories: &["Series"],
        cast: &["Millie Bobby Brown", "Finn Wolfhard", "Winona Ryder"],
        director: "The Duffer Brothers",
        rating: 8.7,
        is_trending: true,
        is_featured: false,
        quality: &["1080p", "4K"],
        views: 1_800_000,
    },
    SampleVideo {
        title: "Avengers: Endgame",
        description: "After the devastating events of Avengers: Infinity War, the universe is in ruins due to the efforts of the Mad Titan, Thanos.",
        video_url: "ForBiggerJoyrides.mp4",
        duration: 181,
        year: 2019,
        genres: &["Action", "Adventure", "Drama"],
        languages: &["English"],
        categories: &["Movies"],
        cast: &["Robert Downey Jr.", "Chris Evans", "Mark Ruffalo"],
        director: "Anthony Russo, Joe Russo",
        rating: 8.4,
        is_trending: false,
        is_featured: true,
        quality: &["1080p", "4K"],
        views: 2_500_000,
    },
    SampleVideo {
        title: "Parasite",
        description: "A poor family, the Kims, con their way into becoming the servants of a rich family, the Parks. But their easy life gets complicated when their deception is threatened with exposure.",
        video_url: "ForBiggerMeltdowns.mp4",
        duration: 132,
        year: 2019,
        genres: &["Comedy", "Drama", "Thriller"],
        languages: &["Korean"],
        categories: &["Movies"],
        cast: &["Song Kang-ho", "Lee Sun-kyun", "Cho Yeo-jeong"],
        director: "Bong Joon-ho",
        rating: 8.6,
        is_trending: true,
        is_featured: false,
        quality: &["1080p"],
        views: 950_000,
    },
    SampleVideo {
        title: "The Witcher",
        description: "Geralt of Rivia, a solitary monster hunter, struggles to find his place in a world where people often prove more wicked than beasts.",
        video_url: "Sintel.mp4",
        duration: 60,
        year: 2019,
        genres: &["Action", "Adventure", "Drama"],
        languages: &["English"],
        categories: &["Series"],
        cast: &["Henry Cavill", "Anya Chalotra", "Freya Allan"],
        director: "Lauren Schmidt Hissrich",
        rating: 8.2,
        is_trending: true,
        is_featured: false,
        quality: &["1080p", "4K"],
        views: 1_400_000,
    },
    SampleVideo {
        title: "Dune",
        description: "Paul Atreides, a brilliant and gifted young man born into a great destiny beyond his understanding, must travel to the most dangerous planet in the universe to ensure the future of his family and his people.",
        video_url: "SubaruOutbackOnStreetAndDirt.mp4",
        duration: 155,
        year: 2021,
        genres: &["Action", "Adventure", "Drama"],
        languages: &["English"],
        categories: &["Movies"],
        cast: &["Timothée Chalamet", "Rebecca Ferguson", "Oscar Isaac"],
        director: "Denis Villeneuve",
        rating: 8.0,
        is_trending: false,
        is_featured: true,
        quality: &["1080p", "4K"],
        views: 1_100_000,
    },
    SampleVideo {
        title: "The Mandalorian",
        description: "The travels of a lone bounty hunter in the outer reaches of the galaxy, far from the authority of the New Republic.",
        video_url: "TearsOfSteel.mp4",
        duration: 39,
        year: 2019,
        genres: &["Action", "Adventure", "Sci-Fi"],
        languages: &["English"],
        categories: &["Series"],
        cast: &["Pedro Pascal", "Gina Carano", "Carl Weathers"],
        director: "Jon Favreau",
        rating: 8.8,
        is_trending: true,
        is_featured: false,
        quality: &["1080p", "4K"],
        views: 1_600_000,
    },
];

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

/// The built-in catalog, newest first in list order.
pub fn sample_videos() -> Vec<Video> {
    let now = DateTime::now().timestamp_millis();
    SAMPLES
        .iter()
        .enumerate()
        .map(|(i, s)| {
            let n = i + 1;
            // one second apart so list order is stable
            let created_at = DateTime::from_millis(now - (i as i64) * 1000);
            Video {
                id: None,
                title: s.title.to_string(),
                description: s.description.to_string(),
                video_url: format!("{}/{}", SAMPLE_BUCKET, s.video_url),
                thumbnail: format!("https://picsum.photos/400/600?random={}", n),
                poster: format!("https://picsum.photos/800/450?random={}", n),
                duration: s.duration,
                year: s.year,
                genres: strings(s.genres),
                languages: strings(s.languages),
                categories: strings(s.categories),
                cast: strings(s.cast),
                director: Some(s.director.to_string()),
                rating: s.rating,
                is_trending: s.is_trending,
                is_featured: s.is_featured,
                quality: strings(s.quality),
                universe: None,
                audio_tracks: Vec::new(),
                subtitles: Vec::new(),
                views: s.views,
                created_at,
                updated_at: created_at,
            }
        })
        .collect()
}

const GENERATED_EMBED_URL: &str =
    "https://player.mediadelivery.net/embed/515631/e829e124-448f-4fcd-9c1d-865aba840af6";
const GENERATED_TITLES: &[&str] = &[
    "The Last Tower", "Shadow Hunter", "Digital Dreams", "Neon Nights", "Steel Wings",
    "Crystal Empire", "Dark Waters", "Fire Storm", "Ice Queen", "Thunder Strike",
    "Golden Arrow", "Silent Storm", "Blood Moon", "Silver Blade", "Ghost Signal",
    "Phoenix Rising", "Dragon's Eye", "Wolf Pack", "Storm Rider", "Wind Walker",
    "Solar Flare", "Lunar Eclipse", "Cosmic Journey", "Moon Base", "Black Hole",
    "Future Shock", "Code Red", "Blue Steel", "Ocean Deep", "Mountain High",
    "Highway Chase", "Castle Siege", "Task Force", "Delta Unit", "Final Hour",
    "Last Stand", "Second Chance", "Night Crawler", "Dawn Patrol", "Midnight Run",
];
const GENERATED_PREFIXES: &[&str] = &["Ultimate", "Extreme", "Maximum", "Super", "Hyper"];
const GENERATED_SUFFIXES: &[&str] = &["Warrior", "Guardian", "Defender", "Champion", "Legend"];
const GENERATED_GENRES: &[&str] = &[
    "Action", "Adventure", "Thriller", "Sci-Fi", "Drama", "Crime", "Mystery", "Horror",
    "Fantasy", "War",
];
const GENERATED_LANGUAGES: &[&str] = &["English", "Spanish", "French", "German", "Japanese", "Korean"];
const GENERATED_DIRECTORS: &[&str] = &[
    "Ava Stone", "Marcus Reed", "Lena Ortiz", "Hiro Tanaka", "Priya Nair", "Tomas Berg",
];
const GENERATED_UNIVERSES: &[&str] = &["Skyline", "Iron Circle", "Deep Fleet"];
const QUALITIES: &[&str] = &["720p", "1080p", "4K"];

fn pick<'a>(values: &[&'a str], n: usize) -> &'a str {
    values[n % values.len()]
}

/// A larger synthetic catalog for exercising pagination and rows. Deterministic
/// per index, so repeated seeds produce the same titles and flags.
pub fn generated_videos(count: usize) -> Vec<Video> {
    let now = DateTime::now().timestamp_millis();
    (0..count)
        .map(|i| {
            let n = i + 1;
            let title = match GENERATED_TITLES.get(i) {
                Some(title) => title.to_string(),
                None => format!(
                    "{} {} {}",
                    pick(GENERATED_PREFIXES, i),
                    pick(GENERATED_SUFFIXES, i / GENERATED_PREFIXES.len()),
                    n
                ),
            };
            let mut genres = vec![pick(GENERATED_GENRES, i).to_string()];
            if i % 3 == 0 {
                genres.push(pick(GENERATED_GENRES, i + 3).to_string());
            }
            let mut languages = vec![pick(GENERATED_LANGUAGES, i / 2).to_string()];
            if i % 4 == 0 && languages[0] != "English" {
                languages.push("English".to_string());
            }
            let created_at = DateTime::from_millis(now - (i as i64) * 1000);
            Video {
                id: None,
                title,
                description: format!(
                    "Episode {} of the generated catalog: a {} story.",
                    n,
                    genres[0].to_lowercase()
                ),
                video_url: GENERATED_EMBED_URL.to_string(),
                thumbnail: format!("https://picsum.photos/400/600?random={}", n),
                poster: format!("https://picsum.photos/800/450?random={}", n),
                duration: 90 + ((i * 37) % 120) as i32,
                year: 2020 + (i % 6) as i32,
                genres,
                languages,
                categories: vec![if i % 2 == 0 { "Movies" } else { "Series" }.to_string()],
                cast: vec![
                    format!("Actor {}", (i * 7) % 40 + 1),
                    format!("Actor {}", (i * 11) % 40 + 1),
                ],
                director: Some(pick(GENERATED_DIRECTORS, i).to_string()),
                rating: 6.0 + ((i * 13) % 40) as f64 / 10.0,
                is_trending: i % 10 < 3,
                is_featured: i % 7 == 0,
                quality: strings(&QUALITIES[..1 + i % QUALITIES.len()]),
                universe: (i % 10 >= 7).then(|| pick(GENERATED_UNIVERSES, i).to_string()),
                audio_tracks: Vec::new(),
                subtitles: Vec::new(),
                views: 100_000 + ((i as i64 * 7919) % 2_000_000),
                created_at,
                updated_at: created_at,
            }
        })
        .collect()
}

fn default_categories() -> Vec<Category> {
    let now = DateTime::now();
    [("Movies", "movies"), ("Series", "series")]
        .iter()
        .enumerate()
        .map(|(i, (name, slug))| Category {
            id: None,
            name: name.to_string(),
            slug: slug.to_string(),
            order: i as i32,
            kind: CategoryType::Default,
            created_at: now,
            updated_at: now,
        })
        .collect()
}

/// Replaces the whole catalog with the sample set. Returns the number inserted.
pub async fn reseed_videos(store: &dyn Store) -> StoreResult<u64> {
    replace_catalog(store, sample_videos()).await
}

pub async fn replace_catalog(store: &dyn Store, videos: Vec<Video>) -> StoreResult<u64> {
    let removed = store.delete_all_videos().await?;
    let inserted = store.insert_videos(videos).await?;
    log::info!("catalog reseeded: {} removed, {} inserted", removed, inserted);
    Ok(inserted)
}

/// Startup seeding: only touches collections that are still empty.
pub async fn init_all_data(store: &dyn Store) -> StoreResult<()> {
    if store.count_videos().await? == 0 {
        let inserted = store.insert_videos(sample_videos()).await?;
        log::info!("seeded {} sample videos", inserted);
    } else {
        log::info!("catalog not empty, skipping sample videos");
    }

    if store.list_categories().await?.is_empty() {
        for category in default_categories() {
            store.insert_category(category).await?;
        }
        log::info!("seeded default categories");
    }
    Ok(())
}
