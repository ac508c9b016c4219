pub struct Icons;

impl Icons {
    pub const CHECK: &str = "✅";
    pub const CROSS: &str = "❌";
    pub const WARN: &str = "⚠️";
    pub const STATS: &str = "📊";
    pub const DEL: &str = "🗑️";
    pub const PACKAGE: &str = "📦";
    pub const KEY: &str = "🔑";
    pub const BROOM: &str = "🧹";
}
