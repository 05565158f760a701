use common::UserId;
use domain::{Book, Language, Order};

/// Filter for listing orders. Results are newest first.
#[derive(Debug, Clone, Default)]
pub struct OrderQuery {
    /// Only orders placed by this user.
    pub user_id: Option<UserId>,
}

impl OrderQuery {
    /// Creates a query matching every order.
    pub fn all() -> Self {
        Self::default()
    }

    /// Creates a query for one user's orders.
    pub fn for_user(user_id: UserId) -> Self {
        Self {
            user_id: Some(user_id),
        }
    }

    pub fn matches(&self, order: &Order) -> bool {
        self.user_id.is_none_or(|user_id| order.is_owned_by(user_id))
    }
}

/// Filter for browsing the catalog. Results are sorted by title.
#[derive(Debug, Clone, Default)]
pub struct BookQuery {
    /// Hide books that are not on sale.
    pub on_sale_only: bool,

    /// Only books in this language.
    pub language: Option<Language>,

    /// Case-insensitive substring of title or author.
    pub keyword: Option<String>,
}

impl BookQuery {
    /// Creates a query matching the whole catalog.
    pub fn all() -> Self {
        Self::default()
    }

    /// Creates a query matching books customers may buy.
    pub fn on_sale() -> Self {
        Self {
            on_sale_only: true,
            ..Default::default()
        }
    }

    pub fn in_language(mut self, language: Language) -> Self {
        self.language = Some(language);
        self
    }

    pub fn with_keyword(mut self, keyword: impl Into<String>) -> Self {
        let keyword = keyword.into();
        self.keyword = (!keyword.trim().is_empty()).then_some(keyword);
        self
    }

    pub fn matches(&self, book: &Book) -> bool {
        if self.on_sale_only && !book.is_on_sale() {
            return false;
        }
        if let Some(ref language) = self.language
            && &book.details().language != language
        {
            return false;
        }
        if let Some(ref keyword) = self.keyword
            && !book.matches_keyword(keyword)
        {
            return false;
        }
        true
    }
}
