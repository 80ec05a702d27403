//! Probe script dispatch table.
//!
//! Every `ProbeRequest` resolves to one JavaScript snippet here. Tactic
//! scripts all return the same envelope so the executor has a single parse
//! path: `{ success, details, data, features_unlocked }`.

use crate::catalog::TacticId;
use crate::session::ProbeRequest;

/// Resolve a probe request to the script the session should evaluate.
pub fn script_for(request: ProbeRequest) -> &'static str {
    match request {
        ProbeRequest::Metrics => METRICS_SCRIPT,
        ProbeRequest::ElementCensus => ELEMENT_CENSUS_SCRIPT,
        ProbeRequest::Tactic(id) => tactic_script(id),
    }
}

/// Observable page metrics, read in one round trip.
///
/// `body_html` rides along so the caller can hash page content without a
/// second evaluation.
const METRICS_SCRIPT: &str = r#"(() => {
    return {
        total_elements: document.querySelectorAll('*').length,
        visible_elements: document.querySelectorAll(':not([style*="display: none"]):not([hidden])').length,
        hidden_elements: document.querySelectorAll('[style*="display: none"], [hidden]').length,
        interactive_elements: document.querySelectorAll('button, a, input, select, textarea').length,
        buttons: document.querySelectorAll('button').length,
        inputs: document.querySelectorAll('input, textarea, select').length,
        links: document.links.length,
        forms: document.forms.length,
        images: document.images.length,
        scripts: document.scripts.length,
        iframes: document.querySelectorAll('iframe').length,
        body_text_length: document.body ? document.body.textContent.length : 0,
        local_storage_items: Object.keys(localStorage).length,
        body_html: document.body ? document.body.innerHTML : ''
    };
})()"#;

/// Counts of interactive elements by selector class, for checkpoint
/// new-element detection.
const ELEMENT_CENSUS_SCRIPT: &str = r#"(() => {
    const selectors = [
        'button', 'a[href]', 'input:not([type="hidden"])', 'select',
        '[onclick]', '[role="button"]', '[data-action]'
    ];
    const counts = {};
    selectors.forEach(s => { counts[s] = document.querySelectorAll(s).length; });
    return counts;
})()"#;

fn tactic_script(id: TacticId) -> &'static str {
    use TacticId::*;
    match id {
        RemoveOverlays => r#"(() => {
            const selectors = '[class*="modal"], [class*="overlay"], [class*="popup"], [id*="overlay"], [class*="backdrop"]';
            let removed = 0;
            document.querySelectorAll(selectors).forEach(el => {
                const style = window.getComputedStyle(el);
                if (style.position === 'fixed' || style.position === 'absolute') {
                    el.remove();
                    removed++;
                }
            });
            document.body.style.overflow = 'auto';
            document.documentElement.style.overflow = 'auto';
            return {
                success: removed > 0,
                details: removed + ' overlay elements removed',
                data: { removed: removed },
                features_unlocked: removed > 0 ? ['unobstructed_view'] : []
            };
        })()"#,
        ExpandContent => r#"(() => {
            let expanded = 0;
            document.querySelectorAll('details:not([open])').forEach(el => { el.open = true; expanded++; });
            document.querySelectorAll('[aria-expanded="false"]').forEach(el => {
                el.setAttribute('aria-expanded', 'true');
                el.click && el.click();
                expanded++;
            });
            document.querySelectorAll('[class*="collapsed"], [class*="truncated"]').forEach(el => {
                el.classList.remove('collapsed', 'truncated');
                expanded++;
            });
            return {
                success: expanded > 0,
                details: expanded + ' sections expanded',
                data: { expanded: expanded },
                features_unlocked: []
            };
        })()"#,
        RemoveSticky => r#"(() => {
            let removed = 0;
            document.querySelectorAll('*').forEach(el => {
                const style = window.getComputedStyle(el);
                if (style.position === 'sticky' || (style.position === 'fixed' && el.tagName !== 'BODY')) {
                    el.style.position = 'static';
                    removed++;
                }
            });
            return {
                success: removed > 0,
                details: removed + ' sticky elements neutralized',
                data: { removed: removed },
                features_unlocked: []
            };
        })()"#,
        RevealHidden => r#"(() => {
            let revealed = 0;
            document.querySelectorAll('[style*="display: none"], [style*="visibility: hidden"], [hidden]').forEach(el => {
                el.style.display = '';
                el.style.visibility = 'visible';
                el.removeAttribute('hidden');
                revealed++;
            });
            return {
                success: revealed > 0,
                details: revealed + ' hidden elements revealed',
                data: { revealed: revealed },
                features_unlocked: []
            };
        })()"#,
        DisableLazyLoading => r#"(() => {
            let forced = 0;
            document.querySelectorAll('img[data-src], img[data-lazy-src], img.lazy').forEach(img => {
                const src = img.dataset.src || img.dataset.lazySrc;
                if (src) { img.src = src; forced++; }
            });
            document.querySelectorAll('[loading="lazy"]').forEach(el => {
                el.loading = 'eager';
                forced++;
            });
            window.scrollTo(0, document.body.scrollHeight);
            window.scrollTo(0, 0);
            return {
                success: forced > 0,
                details: forced + ' lazy elements forced',
                data: { forced: forced },
                features_unlocked: []
            };
        })()"#,
        BypassRightClick => r#"(() => {
            document.oncontextmenu = null;
            document.onselectstart = null;
            document.body.style.userSelect = 'auto';
            document.body.style.webkitUserSelect = 'auto';
            ['contextmenu', 'selectstart', 'copy'].forEach(type => {
                window.addEventListener(type, e => e.stopPropagation(), true);
            });
            return {
                success: true,
                details: 'right-click and text selection restored',
                data: {},
                features_unlocked: ['text_selection']
            };
        })()"#,
        BypassPaywall => r#"(() => {
            let cleared = 0;
            document.querySelectorAll('[class*="paywall"], [id*="paywall"], [class*="premium-wall"]').forEach(el => {
                el.remove();
                cleared++;
            });
            document.querySelectorAll('[style*="blur"]').forEach(el => {
                el.style.filter = 'none';
                cleared++;
            });
            document.querySelectorAll('[class*="gradient-overlay"], [class*="fade-out"]').forEach(el => {
                el.remove();
                cleared++;
            });
            document.body.style.overflow = 'auto';
            return {
                success: cleared > 0,
                details: cleared + ' paywall elements cleared',
                data: { cleared: cleared },
                features_unlocked: cleared > 0 ? ['paywalled_content'] : []
            };
        })()"#,
        ManipulateCookies => r#"(() => {
            const flags = ['consent=true', 'cookies_accepted=1', 'gdpr_consent=1', 'age_verified=1'];
            flags.forEach(c => { document.cookie = c + '; path=/'; });
            return {
                success: true,
                details: flags.length + ' consent cookies set',
                data: { set: flags.length },
                features_unlocked: []
            };
        })()"#,
        OverrideJsChecks => r#"(() => {
            let overridden = [];
            ['isSubscriber', 'isPremium', 'isLoggedIn', 'hasAccess'].forEach(name => {
                if (name in window) { window[name] = true; overridden.push(name); }
            });
            if (window.localStorage) {
                ['subscriber', 'premium', 'logged_in'].forEach(key => {
                    if (localStorage.getItem(key) !== null) {
                        localStorage.setItem(key, 'true');
                        overridden.push('localStorage.' + key);
                    }
                });
            }
            return {
                success: overridden.length > 0,
                details: overridden.length + ' access checks overridden',
                data: { overridden: overridden },
                features_unlocked: overridden.length > 0 ? ['gated_content'] : []
            };
        })()"#,
        SpoofReferrer => r#"(() => {
            try {
                Object.defineProperty(document, 'referrer', {
                    get: () => 'https://www.google.com/',
                    configurable: true
                });
                return {
                    success: true,
                    details: 'referrer spoofed to search origin',
                    data: { referrer: document.referrer },
                    features_unlocked: []
                };
            } catch (e) {
                return { success: false, details: '', error: String(e), data: {}, features_unlocked: [] };
            }
        })()"#,
        ExtractHiddenData => r#"(() => {
            const data = { meta: {}, json_ld: [], data_attrs: 0 };
            document.querySelectorAll('meta[name], meta[property]').forEach(m => {
                const key = m.getAttribute('name') || m.getAttribute('property');
                if (key) data.meta[key] = (m.getAttribute('content') || '').substring(0, 200);
            });
            document.querySelectorAll('script[type="application/ld+json"]').forEach(s => {
                try { data.json_ld.push(JSON.parse(s.textContent)); } catch (e) {}
            });
            data.data_attrs = document.querySelectorAll('[data-id], [data-item-id], [data-product-id]').length;
            const found = Object.keys(data.meta).length + data.json_ld.length + data.data_attrs;
            return {
                success: found > 0,
                details: found + ' hidden data items extracted',
                data: data,
                features_unlocked: []
            };
        })()"#,
        ExtractShadowDom => r#"(() => {
            const hosts = [];
            document.querySelectorAll('*').forEach(el => {
                if (el.shadowRoot) {
                    hosts.push({
                        tag: el.tagName,
                        text_length: el.shadowRoot.textContent.length,
                        elements: el.shadowRoot.querySelectorAll('*').length
                    });
                }
            });
            return {
                success: hosts.length > 0,
                details: hosts.length + ' shadow roots found',
                data: { hosts: hosts },
                features_unlocked: []
            };
        })()"#,
        ExtractStorage => r#"(() => {
            const storage = { local: {}, session: {} };
            Object.keys(localStorage).forEach(k => {
                storage.local[k] = (localStorage.getItem(k) || '').substring(0, 500);
            });
            Object.keys(sessionStorage).forEach(k => {
                storage.session[k] = (sessionStorage.getItem(k) || '').substring(0, 500);
            });
            const count = Object.keys(storage.local).length + Object.keys(storage.session).length;
            return {
                success: count > 0,
                details: count + ' storage items extracted',
                data: storage,
                features_unlocked: []
            };
        })()"#,
        ExtractCanvas => r#"(() => {
            const canvases = [];
            document.querySelectorAll('canvas').forEach((c, i) => {
                try {
                    canvases.push({ index: i, width: c.width, height: c.height, data_url_length: c.toDataURL().length });
                } catch (e) {
                    canvases.push({ index: i, width: c.width, height: c.height, tainted: true });
                }
            });
            return {
                success: canvases.length > 0,
                details: canvases.length + ' canvas elements inspected',
                data: { canvases: canvases },
                features_unlocked: []
            };
        })()"#,
        DetectAjax => r#"(() => {
            const indicators = {
                fetch_wrapped: typeof window.fetch === 'function',
                xhr_present: typeof XMLHttpRequest !== 'undefined',
                ajax_elements: document.querySelectorAll('[data-ajax], [data-load], [data-remote]').length,
                spinners: document.querySelectorAll('[class*="spinner"], [class*="loading"]').length,
                resource_count: performance.getEntriesByType('resource').length
            };
            return {
                success: true,
                details: indicators.ajax_elements + ' ajax-marked elements, ' + indicators.resource_count + ' resources',
                data: indicators,
                features_unlocked: []
            };
        })()"#,
        InterceptDownloads => r#"(() => {
            const targets = [];
            document.querySelectorAll('a[download], a[href$=".pdf"], a[href$=".csv"], a[href$=".zip"], a[href$=".xlsx"]').forEach(a => {
                targets.push({ href: a.href, name: a.download || a.href.split('/').pop() });
            });
            return {
                success: targets.length > 0,
                details: targets.length + ' download targets intercepted',
                data: { targets: targets.slice(0, 50) },
                features_unlocked: targets.length > 0 ? ['direct_downloads'] : []
            };
        })()"#,
        HumanizeBrowser => r#"(() => {
            try {
                Object.defineProperty(navigator, 'webdriver', { get: () => undefined, configurable: true });
                window.chrome = window.chrome || { runtime: {} };
                Object.defineProperty(navigator, 'plugins', { get: () => [1, 2, 3], configurable: true });
                return {
                    success: true,
                    details: 'automation fingerprints masked',
                    data: { webdriver: navigator.webdriver === undefined },
                    features_unlocked: []
                };
            } catch (e) {
                return { success: false, details: '', error: String(e), data: {}, features_unlocked: [] };
            }
        })()"#,
        ProbeEndpoints => r#"(() => {
            const endpoints = new Set();
            document.querySelectorAll('a[href*="/api/"], form[action*="/api/"]').forEach(el => {
                endpoints.add(el.href || el.action);
            });
            Array.from(document.scripts).forEach(s => {
                const content = s.textContent || '';
                const matches = content.match(/["'](\/api\/[A-Za-z0-9_\/.-]+)["']/g) || [];
                matches.slice(0, 20).forEach(m => endpoints.add(m.replace(/["']/g, '')));
            });
            const list = Array.from(endpoints).slice(0, 50);
            return {
                success: list.length > 0,
                details: list.length + ' candidate API endpoints',
                data: { endpoints: list },
                features_unlocked: list.length > 0 ? ['api_endpoints'] : []
            };
        })()"#,
        BypassCloudflare => r#"(() => {
            const challenge = document.querySelector('#challenge-form, #cf-challenge-running, [class*="cf-browser-verification"]');
            if (!challenge) {
                return {
                    success: true,
                    details: 'no challenge present',
                    data: { challenge_present: false },
                    features_unlocked: []
                };
            }
            return {
                success: false,
                details: 'challenge active, cannot clear from page context',
                error: 'challenge active',
                data: { challenge_present: true },
                features_unlocked: []
            };
        })()"#,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog;

    #[test]
    fn test_every_tactic_has_a_script() {
        for def in catalog::liberation_catalog() {
            let script = script_for(ProbeRequest::Tactic(def.id));
            assert!(
                script.contains("success"),
                "{:?} script must return the result envelope",
                def.id
            );
        }
    }

    #[test]
    fn test_capture_scripts_return_objects() {
        assert!(script_for(ProbeRequest::Metrics).contains("total_elements"));
        assert!(script_for(ProbeRequest::ElementCensus).contains("counts"));
    }
}
