use rand::seq::SliceRandom;

/// Username used when the user clears the name field.
pub const FALLBACK_USERNAME: &str = "User";

const SAMPLE_USERNAMES: &[&str] = &[
    "CoffeeAddict42",
    "PizzaLover99",
    "TacoTuesday",
    "WaffleWarrior",
    "NachoAverage",
    "RamenRider",
    "SushiSamurai",
    "KeyboardWarrior",
    "CtrlAltDelete",
    "WiFiWhisperer",
    "DebuggingDuck",
    "PixelPirate",
    "LootGoblin",
    "BugSquasher",
    "GitCommander",
    "CloudSurfer",
    "NetworkNinja",
    "MemeDealer",
    "PodcastPanda",
    "LazyPanda",
    "SleepyDragon",
    "SneakySquirrel",
    "WiseOwl",
    "PlayfulPenguin",
    "BoldBadger",
    "KindKoala",
    "SockThief",
    "CouchPotato",
    "GiggleBox",
    "ZenMaster",
    "CalmCactus",
    "BookWorm",
    "GardeningGuru",
    "NoodleNinja",
    "PuddleJumper",
    "MoonDancer",
    "SparkPlug",
    "WobbleWalrus",
    "SillyGoose",
    "DriftingDuck",
];

/// Pick a random playful username for a fresh session.
pub fn random_username() -> String {
    SAMPLE_USERNAMES
        .choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or(FALLBACK_USERNAME)
        .to_string()
}

/// Normalize a user-supplied username, falling back to [`FALLBACK_USERNAME`].
pub fn normalize_username(input: &str) -> String {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        FALLBACK_USERNAME.to_string()
    } else {
        trimmed.to_string()
    }
}
