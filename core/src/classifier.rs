use ahash::AHashSet;
use once_cell::sync::Lazy;
use phf::phf_set;
use regex::Regex;
use serde::Serialize;

use crate::signatures::SignatureCatalog;

/// Url schemes worth reporting
const URL_SCHEMES: &str =
    "https?|ftps?|sftp|file|content|rtsp|rtmp|wss?|market|intent|jdbc|ldap|smb|git|ssh|tcp|udp";

/// Scheme-qualified url: `scheme://host[:port][/path...]`
static URL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r#"(?i)\b(?:{URL_SCHEMES})://[^\s"'<>]+"#))
        .expect("url pattern must compile")
});

/// Separator followed by the next url, as in `http://a.b,http://c.d`
static URL_SEPARATOR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"(?i)[,;|](?:{URL_SCHEMES})://")).expect("url separator must compile")
});

/// Sentence punctuation that is not part of a url when it comes last
const TRAILING_PUNCTUATION: &[char] = &['.', ',', ';', ':', '!', '?', ')', ']', '}'];

/// Commands usually passed to `Runtime.exec` or a root shell
///
/// Matched only by equality with the whole string.
static SHELL_COMMANDS: phf::Set<&'static str> = phf_set! {
    "am",
    "busybox",
    "cat",
    "chgrp",
    "chmod",
    "chown",
    "cp",
    "curl",
    "dd",
    "dumpsys",
    "echo",
    "getprop",
    "id",
    "ifconfig",
    "insmod",
    "iptables",
    "kill",
    "killall",
    "ln",
    "logcat",
    "ls",
    "mkdir",
    "mount",
    "mv",
    "nc",
    "netcfg",
    "netstat",
    "pm",
    "ps",
    "reboot",
    "rm",
    "rmdir",
    "rmmod",
    "screencap",
    "sendevent",
    "set",
    "setenforce",
    "setprop",
    "sh",
    "sleep",
    "su",
    "sync",
    "toolbox",
    "top",
    "touch",
    "umount",
    "uname",
    "wget",
    "whoami",
};

/// Findings of every detector, deduplicated and in first-seen order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Classification {
    pub urls: Vec<String>,
    pub shell_commands: Vec<String>,
    pub custom_signatures: Vec<String>,
}

/// Insertion-ordered set of borrowed strings
#[derive(Default)]
struct Collector<'a> {
    seen: AHashSet<&'a str>,
    items: Vec<&'a str>,
}

impl<'a> Collector<'a> {
    #[inline]
    fn insert(&mut self, s: &'a str) {
        if self.seen.insert(s) {
            self.items.push(s);
        }
    }

    fn into_vec(self) -> Vec<String> {
        self.items.into_iter().map(str::to_owned).collect()
    }
}

#[inline]
pub fn is_shell_command(s: &str) -> bool {
    SHELL_COMMANDS.contains(s)
}

/// Drop trailing punctuation, keeping a closing bracket that has its opening pair
fn trim_url(url: &str) -> &str {
    let mut url = url;

    while let Some(last) = url.chars().next_back() {
        if !TRAILING_PUNCTUATION.contains(&last) {
            break;
        }

        let open = match last {
            ')' => '(',
            ']' => '[',
            '}' => '{',
            _ => '\0',
        };
        if open != '\0' && url.matches(open).count() >= url.matches(last).count() {
            break;
        }

        url = &url[..url.len() - last.len_utf8()];
    }

    url
}

/// Split a regex match holding several concatenated urls
fn split_urls(candidate: &str) -> Vec<&str> {
    let mut urls = Vec::new();
    let mut start = 0;

    for separator in URL_SEPARATOR.find_iter(candidate) {
        urls.push(&candidate[start..separator.start()]);
        // separator is a single ascii byte
        start = separator.start() + 1;
    }
    urls.push(&candidate[start..]);

    urls.into_iter()
        .map(trim_url)
        .filter(|url| !url.ends_with("://"))
        .collect()
}

/// Every url occurring inside any of the strings
pub fn find_urls(strings: &[String]) -> Vec<String> {
    let mut urls = Collector::default();
    for s in strings {
        for m in URL_PATTERN.find_iter(s) {
            for url in split_urls(m.as_str()) {
                urls.insert(url);
            }
        }
    }

    urls.into_vec()
}

/// Strings equal to a known shell command
pub fn find_shell_commands(strings: &[String]) -> Vec<String> {
    let mut commands = Collector::default();
    for s in strings.iter().filter(|s| is_shell_command(s)) {
        commands.insert(s);
    }

    commands.into_vec()
}

/// Runs all detectors over a string pool
pub struct Classifier<'c> {
    catalog: &'c SignatureCatalog,
}

impl<'c> Classifier<'c> {
    pub fn new(catalog: &'c SignatureCatalog) -> Classifier<'c> {
        Classifier { catalog }
    }

    pub fn classify(&self, strings: &[String]) -> Classification {
        Classification {
            urls: find_urls(strings),
            shell_commands: find_shell_commands(strings),
            custom_signatures: self.find_signatures(strings),
        }
    }

    /// Labels of catalog signatures matched by any string
    pub fn find_signatures(&self, strings: &[String]) -> Vec<String> {
        if self.catalog.is_empty() {
            return Vec::new();
        }

        let mut labels = Collector::default();
        for s in strings {
            for label in self.catalog.matches(s) {
                labels.insert(label);
            }
        }

        labels.into_vec()
    }
}
