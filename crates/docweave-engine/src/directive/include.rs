/// How an include shifts the heading depth of the included content
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LevelOffset {
    /// `leveloffset=2`
    Absolute(i32),
    /// `leveloffset=+1` or `leveloffset=-1`
    Relative(i32),
}

impl LevelOffset {
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        if value.starts_with('+') || value.starts_with('-') {
            value.parse::<i32>().ok().map(LevelOffset::Relative)
        } else {
            value.parse::<i32>().ok().map(LevelOffset::Absolute)
        }
    }

    /// Offset for the included file, given the including file's offset
    pub fn apply(self, base: i32) -> i32 {
        match self {
            LevelOffset::Absolute(offset) => offset,
            LevelOffset::Relative(delta) => base + delta,
        }
    }
}

/// The recognised parts of an include option list (`key=value,...`)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IncludeOptions {
    pub level_offset: Option<LevelOffset>,
    /// `tag` followed by the `;`-separated entries of `tags`, in order
    pub tags: Vec<String>,
}

impl IncludeOptions {
    pub fn parse(options: &str) -> Self {
        let mut parsed = Self::default();
        let mut tag = None;
        let mut tags = Vec::new();

        for option in options.split(',') {
            let Some((key, value)) = option.split_once('=') else {
                continue;
            };
            let value = value.trim().trim_matches('"');
            match key.trim().to_lowercase().as_str() {
                "leveloffset" => {
                    parsed.level_offset = LevelOffset::parse(value);
                    if parsed.level_offset.is_none() {
                        log::warn!("Ignoring unparsable leveloffset: {value}");
                    }
                }
                "tag" => tag = Some(value.to_string()),
                "tags" => tags.extend(value.split(';').map(|t| t.trim().to_string())),
                _ => {}
            }
        }

        parsed.tags = tag.into_iter().chain(tags).filter(|t| !t.is_empty()).collect();
        parsed
    }
}
