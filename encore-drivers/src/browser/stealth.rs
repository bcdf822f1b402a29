use super::fingerprint::UserAgentProfile;
use encore_config::StealthLevel;

/// Construct Chrome command-line arguments for an isolated, non-persistent
/// session with automation flags suppressed.
pub fn build_stealth_arguments(
    level: StealthLevel,
    user_profile: &UserAgentProfile,
    headless: bool,
    extra: &[String],
) -> Vec<String> {
    let mut args = vec![
        "--disable-blink-features=AutomationControlled".to_string(),
        "--disable-infobars".to_string(),
        "--disable-notifications".to_string(),
        "--disable-dev-shm-usage".to_string(),
        "--no-sandbox".to_string(),
        "--disable-extensions".to_string(),
        "--disable-plugins-discovery".to_string(),
        "--incognito".to_string(),
        "--start-maximized".to_string(),
        format!("--user-agent={}", user_profile.user_agent),
        format!(
            "--window-size={},{}",
            user_profile.viewport.0, user_profile.viewport.1
        ),
        format!("--lang={}", user_profile.languages.join(",")),
    ];
    if headless {
        args.push("--headless".to_string());
    }
    if headless || level == StealthLevel::Maximum {
        args.push("--disable-gpu".to_string());
    }
    args.extend(extra.iter().cloned());
    args
}

/// JavaScript evasions applied after navigation to reduce automation signals.
pub struct StealthScripts;

impl StealthScripts {
    /// Scripts to run for `level`, weakest first.
    pub fn for_level(level: StealthLevel) -> Vec<&'static str> {
        match level {
            StealthLevel::Lightweight => vec![Self::core()],
            StealthLevel::Balanced => vec![Self::core(), Self::canvas()],
            StealthLevel::Maximum => vec![Self::core(), Self::canvas(), Self::webgl()],
        }
    }

    pub fn core() -> &'static str {
        r#"
            Object.defineProperty(navigator, 'webdriver', { get: () => undefined });
            Object.defineProperty(navigator, 'plugins', { get: () => [1,2,3] });
            Object.defineProperty(navigator, 'languages', {
                get: () => ['en-US', 'en']
            });
            if (!window.chrome) window.chrome = { runtime: {} };
        "#
    }

    pub fn webgl() -> &'static str {
        r#"
            const getParameter = WebGLRenderingContext.prototype.getParameter;
            WebGLRenderingContext.prototype.getParameter = function(parameter) {
                if (parameter === 37445) return 'Intel Inc.';
                if (parameter === 37446) return 'Intel Iris OpenGL Engine';
                return getParameter.call(this, parameter);
            };
        "#
    }

    pub fn canvas() -> &'static str {
        r#"
            const getContext = HTMLCanvasElement.prototype.getContext;
            HTMLCanvasElement.prototype.getContext = function(type, ...args) {
                const ctx = getContext.call(this, type, ...args);
                if (type === '2d' && ctx) {
                    const origToDataURL = this.toDataURL;
                    this.toDataURL = function(...a) {
                        const img = ctx.getImageData(0, 0, this.width, this.height);
                        for (let i = 0; i < img.data.length; i += 4) {
                            if (Math.random() < 0.001) img.data[i] += Math.random() < 0.5 ? -1 : 1;
                        }
                        ctx.putImageData(img, 0, 0);
                        return origToDataURL.call(this, ...a);
                    };
                }
                return ctx;
            };
        "#
    }

    /// Pin `navigator.platform` to the session fingerprint.
    pub fn platform(profile: &UserAgentProfile) -> String {
        format!(
            "Object.defineProperty(navigator, 'platform', {{ get: () => '{}' }});",
            profile.platform.replace('\'', "")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::fingerprint::UserAgentManager;

    #[test]
    fn headless_session_is_isolated_and_unflagged() {
        let profile = UserAgentManager::new().pick();
        let args = build_stealth_arguments(StealthLevel::Balanced, &profile, true, &[]);
        for expected in [
            "--headless",
            "--no-sandbox",
            "--incognito",
            "--disable-dev-shm-usage",
            "--disable-blink-features=AutomationControlled",
        ] {
            assert!(args.iter().any(|a| a == expected), "missing {expected}");
        }
        assert!(args.contains(&format!("--user-agent={}", profile.user_agent)));
    }

    #[test]
    fn headed_session_keeps_gpu_unless_maximum() {
        let profile = UserAgentManager::new().pick();
        let args = build_stealth_arguments(StealthLevel::Lightweight, &profile, false, &[]);
        assert!(!args.iter().any(|a| a == "--headless" || a == "--disable-gpu"));

        let args = build_stealth_arguments(StealthLevel::Maximum, &profile, false, &[]);
        assert!(args.iter().any(|a| a == "--disable-gpu"));
    }

    #[test]
    fn extra_arguments_are_appended_last() {
        let profile = UserAgentManager::new().pick();
        let extra = vec!["--proxy-server=socks5://127.0.0.1:9050".to_string()];
        let args = build_stealth_arguments(StealthLevel::Balanced, &profile, true, &extra);
        assert_eq!(args.last(), extra.last());
    }

    #[test]
    fn scripts_scale_with_level() {
        assert_eq!(StealthScripts::for_level(StealthLevel::Lightweight).len(), 1);
        assert_eq!(StealthScripts::for_level(StealthLevel::Maximum).len(), 3);
    }
}
