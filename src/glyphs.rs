#[derive(Clone, Copy, Debug)]
pub struct MenuGlyphs<'a> {
    /// Repeated across the panel width for separator rows.
    pub separator: &'a str,
    /// Trailing marker of rows that open a submenu.
    pub submenu: &'a str,
}

impl MenuGlyphs<'static> {
    pub const fn unicode() -> Self {
        Self {
            separator: "─",
            submenu: "▶",
        }
    }

    pub const fn ascii() -> Self {
        Self {
            separator: "-",
            submenu: ">",
        }
    }
}

impl Default for MenuGlyphs<'static> {
    fn default() -> Self {
        Self::unicode()
    }
}
