use std::fmt;
use std::str::FromStr;

/// Substituted for a missing topic or context.
pub const PLACEHOLDER: &str = "—";

pub const CODING_FOOTER: &str = "Final output format:
- ✅ Step-by-step plan
- ✅ File tree
- ✅ Full code (ready to copy and paste)
- ✅ No long-winded explanations that aren't needed";

pub const IMAGE_FOOTER: &str = "Output:
- Describe lighting, camera, mood and composition precisely
- Add a negative prompt if one is needed
- Produce the final prompt as a single block ready to copy and paste";

pub const VIDEO_FOOTER: &str = "Output:
- Write the scene shot by shot where it helps
- Cover visual style, lighting, sound ambience and pacing
- Produce the final prompt as a single block ready to copy and paste";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ToolMode {
    #[default]
    Coding,
    Image,
    Video,
}

impl ToolMode {
    pub const ALL: [ToolMode; 3] = [ToolMode::Coding, ToolMode::Image, ToolMode::Video];

    pub fn as_str(self) -> &'static str {
        match self {
            ToolMode::Coding => "coding",
            ToolMode::Image => "image",
            ToolMode::Video => "video",
        }
    }

    pub fn footer(self) -> &'static str {
        match self {
            ToolMode::Coding => CODING_FOOTER,
            ToolMode::Image => IMAGE_FOOTER,
            ToolMode::Video => VIDEO_FOOTER,
        }
    }
}

impl fmt::Display for ToolMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ToolMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "coding" => Ok(ToolMode::Coding),
            "image" => Ok(ToolMode::Image),
            "video" => Ok(ToolMode::Video),
            other => Err(format!("unknown tool '{other}' (expected coding, image or video)")),
        }
    }
}

/// A named form input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Topic,
    Context,
    Language,
    Framework,
    UseCase,
    Tone,
    Style,
    ImageModel,
    Size,
    VideoTool,
    Duration,
    Mood,
    Movement,
}

impl Field {
    pub const ALL: [Field; 13] = [
        Field::Topic,
        Field::Context,
        Field::Language,
        Field::Framework,
        Field::UseCase,
        Field::Tone,
        Field::Style,
        Field::ImageModel,
        Field::Size,
        Field::VideoTool,
        Field::Duration,
        Field::Mood,
        Field::Movement,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Field::Topic => "topic",
            Field::Context => "context",
            Field::Language => "language",
            Field::Framework => "framework",
            Field::UseCase => "use-case",
            Field::Tone => "tone",
            Field::Style => "style",
            Field::ImageModel => "image-model",
            Field::Size => "size",
            Field::VideoTool => "video-tool",
            Field::Duration => "duration",
            Field::Mood => "mood",
            Field::Movement => "movement",
        }
    }

    pub fn default_value(self) -> &'static str {
        match self {
            Field::Topic | Field::Context => PLACEHOLDER,
            Field::Language => "TypeScript",
            Field::Framework => "React",
            Field::UseCase => "Build a feature",
            Field::Tone => "Professional",
            Field::Style => "Cinematic Realism",
            Field::ImageModel => "Midjourney",
            Field::Size => "1024x1024",
            Field::VideoTool => "Sora / Runway / Pika",
            Field::Duration => "5-10s",
            Field::Mood => "Cinematic",
            Field::Movement => "Slow dolly-in",
        }
    }

    /// Suggested values offered by the form. Free text is accepted too; topic and context have none.
    pub fn choices(self) -> &'static [&'static str] {
        match self {
            Field::Topic | Field::Context => &[],
            Field::Language => &["TypeScript", "JavaScript", "Python", "Go", "Rust"],
            Field::Framework => &["React", "Next.js", "Node.js", "NestJS", "Django"],
            Field::UseCase => &[
                "Build a feature",
                "Debug / Fix",
                "Refactor",
                "API Integration",
                "Database Design",
                "Authentication",
                "Testing",
                "Deployment",
                "Optimization",
                "Architecture",
                "UI Component",
                "Algorithm",
                "Best Practices",
                "Compare Solutions",
                "Code Review",
            ],
            Field::Tone => &["Professional", "Technical", "Educational", "Casual"],
            Field::Style => &["Cinematic Realism", "Anime", "Oil Painting", "Cyberpunk", "Minimal Product Shot"],
            Field::ImageModel => &["Midjourney", "DALL·E", "Stable Diffusion"],
            Field::Size => &["1024x1024", "1024x1792", "1792x1024", "16:9", "9:16"],
            Field::VideoTool => &["Sora / Runway / Pika", "Runway", "Pika", "Sora"],
            Field::Duration => &["5-10s", "10-20s", "30s"],
            Field::Mood => &["Cinematic", "Calm", "Energetic", "Dark"],
            Field::Movement => &["Slow dolly-in", "Handheld", "Drone flyover", "Static"],
        }
    }

    /// Topic and context apply to every mode.
    pub fn applies_to(self, mode: ToolMode) -> bool {
        match self {
            Field::Topic | Field::Context => true,
            Field::Language | Field::Framework | Field::UseCase | Field::Tone => {
                mode == ToolMode::Coding
            }
            Field::Style | Field::ImageModel | Field::Size => mode == ToolMode::Image,
            Field::VideoTool | Field::Duration | Field::Mood | Field::Movement => {
                mode == ToolMode::Video
            }
        }
    }

    /// Whether the form starts with this field pre-filled with its default.
    pub fn prefilled(self) -> bool {
        !matches!(self, Field::Topic | Field::Context)
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Field {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace('_', "-");
        let alias = match wanted.as_str() {
            "lang" => "language",
            "code-type" | "usecase" => "use-case",
            "model" => "image-model",
            "tool-name" | "tool" => "video-tool",
            other => other,
        };
        Field::ALL
            .into_iter()
            .find(|f| f.name() == alias)
            .ok_or_else(|| format!("unknown field '{}'", s.trim()))
    }
}

/// Flat set of form inputs. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PromptFields {
    pub topic: String,
    pub context: String,
    pub language: String,
    pub framework: String,
    pub use_case: String,
    pub tone: String,
    pub style: String,
    pub image_model: String,
    pub size: String,
    pub video_tool: String,
    pub duration: String,
    pub mood: String,
    pub movement: String,
}

impl PromptFields {
    /// Form state as first shown: mode-specific fields carry their defaults.
    pub fn prefilled() -> Self {
        let mut fields = Self::default();
        for field in Field::ALL.into_iter().filter(|f| f.prefilled()) {
            fields.set(field, field.default_value());
        }
        fields
    }

    pub fn get(&self, field: Field) -> &str {
        match field {
            Field::Topic => &self.topic,
            Field::Context => &self.context,
            Field::Language => &self.language,
            Field::Framework => &self.framework,
            Field::UseCase => &self.use_case,
            Field::Tone => &self.tone,
            Field::Style => &self.style,
            Field::ImageModel => &self.image_model,
            Field::Size => &self.size,
            Field::VideoTool => &self.video_tool,
            Field::Duration => &self.duration,
            Field::Mood => &self.mood,
            Field::Movement => &self.movement,
        }
    }

    pub fn set(&mut self, field: Field, value: impl Into<String>) {
        let slot = match field {
            Field::Topic => &mut self.topic,
            Field::Context => &mut self.context,
            Field::Language => &mut self.language,
            Field::Framework => &mut self.framework,
            Field::UseCase => &mut self.use_case,
            Field::Tone => &mut self.tone,
            Field::Style => &mut self.style,
            Field::ImageModel => &mut self.image_model,
            Field::Size => &mut self.size,
            Field::VideoTool => &mut self.video_tool,
            Field::Duration => &mut self.duration,
            Field::Mood => &mut self.mood,
            Field::Movement => &mut self.movement,
        };
        *slot = value.into();
    }

    /// The field's value, or its default when blank.
    pub fn resolved(&self, field: Field) -> &str {
        let value = self.get(field).trim();
        if value.is_empty() { field.default_value() } else { value }
    }
}

/// Render the draft prompt for `mode`. Never fails and never returns an empty string.
pub fn render(mode: ToolMode, fields: &PromptFields) -> String {
    let v = |field: Field| fields.resolved(field);

    let body = match mode {
        ToolMode::Coding => format!(
            "Act as an experienced Senior Software Engineer.

Project / task: {topic}
Use case / title: {use_case}
Language: {language}
Framework / stack: {framework}
Tone: {tone}
Context / requirements: {context}

What to do:
1) Build it production-ready (clean code, error handling, edge cases covered)
2) Propose a folder/file structure and write the main files in full
3) Add unit/integration tests and run/usage steps where needed
4) Deliver the result as one clear answer (step by step, with precise code blocks)",
            topic = v(Field::Topic),
            use_case = v(Field::UseCase),
            language = v(Field::Language),
            framework = v(Field::Framework),
            tone = v(Field::Tone),
            context = v(Field::Context),
        ),
        ToolMode::Image => format!(
            "AI Image Prompt — {model}

Subject: {topic}
Style: {style}
Size / aspect: {size}
Details / context: {context}",
            model = v(Field::ImageModel),
            topic = v(Field::Topic),
            style = v(Field::Style),
            size = v(Field::Size),
            context = v(Field::Context),
        ),
        ToolMode::Video => format!(
            "AI Video Prompt — {tool}

Scene: {topic}
Duration: {duration}
Mood: {mood}
Camera movement: {movement}
Details / context: {context}",
            tool = v(Field::VideoTool),
            topic = v(Field::Topic),
            duration = v(Field::Duration),
            mood = v(Field::Mood),
            movement = v(Field::Movement),
            context = v(Field::Context),
        ),
    };

    format!("{body}\n\n{}", mode.footer())
}
