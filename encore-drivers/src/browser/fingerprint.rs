use rand::Rng;

/// Desktop browser identity presented to the page: user agent, window size,
/// `navigator.platform` and accepted languages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserAgentProfile {
    pub user_agent: String,
    pub viewport: (u32, u32),
    pub platform: String,
    pub languages: Vec<String>,
}

/// (user agent, viewport, platform)
const DESKTOP_PROFILES: &[(&str, (u32, u32), &str)] = &[
    (
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
        (1920, 1080),
        "Win32",
    ),
    (
        "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
        (1440, 900),
        "MacIntel",
    ),
    (
        "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
        (1366, 768),
        "Linux x86_64",
    ),
];

impl UserAgentProfile {
    fn from_entry((user_agent, viewport, platform): (&str, (u32, u32), &str)) -> Self {
        Self {
            user_agent: user_agent.to_string(),
            viewport,
            platform: platform.to_string(),
            languages: vec!["en-US".to_string(), "en".to_string()],
        }
    }
}

/// Pool of plausible desktop fingerprints; each render session draws one.
#[derive(Debug, Clone)]
pub struct UserAgentManager {
    profiles: Vec<UserAgentProfile>,
}

impl Default for UserAgentManager {
    fn default() -> Self {
        Self::new()
    }
}

impl UserAgentManager {
    pub fn new() -> Self {
        Self {
            profiles: DESKTOP_PROFILES
                .iter()
                .copied()
                .map(UserAgentProfile::from_entry)
                .collect(),
        }
    }

    /// Pick a profile for a new session.
    pub fn pick(&self) -> UserAgentProfile {
        if self.profiles.is_empty() {
            return UserAgentProfile::from_entry(DESKTOP_PROFILES[0]);
        }
        let idx = rand::thread_rng().gen_range(0..self.profiles.len());
        self.profiles[idx].clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn picks_from_the_pool() {
        let manager = UserAgentManager::new();
        assert_eq!(manager.profiles.len(), DESKTOP_PROFILES.len());
        for _ in 0..16 {
            let p = manager.pick();
            assert!(manager.profiles.contains(&p));
            assert!(p.user_agent.contains("Chrome/"));
        }
    }

    #[test]
    fn empty_pool_falls_back_to_first_profile() {
        let manager = UserAgentManager {
            profiles: Vec::new(),
        };
        assert_eq!(manager.pick().platform, "Win32");
    }
}
