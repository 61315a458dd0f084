//! UI language selection and translation lookup.
//!
//! Lookup falls back from the selected language to English and finally to
//! echoing the key, so a missing translation never breaks the UI.

use serde::{Deserialize, Serialize};
use tokio::sync::watch;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    En,
    Ru,
}

impl Language {
    pub fn code(self) -> &'static str {
        match self {
            Language::En => "en",
            Language::Ru => "ru",
        }
    }

    /// Native-script display name for the language picker.
    pub fn label(self) -> &'static str {
        match self {
            Language::En => "English",
            Language::Ru => "Русский",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "en" => Some(Language::En),
            "ru" => Some(Language::Ru),
            _ => None,
        }
    }
}

pub struct LanguageStore {
    tx: watch::Sender<Language>,
}

impl Default for LanguageStore {
    fn default() -> Self {
        Self::new()
    }
}

impl LanguageStore {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(Language::default());
        Self { tx }
    }

    pub fn current(&self) -> Language {
        *self.tx.borrow()
    }

    pub fn set(&self, language: Language) {
        self.tx.send_replace(language);
    }

    /// Sets from a language code; unknown codes are ignored.
    pub fn set_code(&self, code: &str) {
        if let Some(language) = Language::from_code(code) {
            self.set(language);
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<Language> {
        self.tx.subscribe()
    }

    /// Translates a key in the current language.
    pub fn t(&self, key: &str) -> String {
        let lang = self.current();
        translate(lang, key)
            .or_else(|| translate(Language::En, key))
            .map(str::to_string)
            .unwrap_or_else(|| key.to_string())
    }

    /// Translates with `{placeholder}` substitution, e.g.
    /// `t_with("mealLogged", &[("count", "3")])`.
    pub fn t_with(&self, key: &str, replacements: &[(&str, &str)]) -> String {
        let mut text = self.t(key);
        for (name, value) in replacements {
            text = text.replace(&format!("{{{name}}}"), value);
        }
        text
    }
}

fn translate(lang: Language, key: &str) -> Option<&'static str> {
    match lang {
        Language::En => en(key),
        Language::Ru => ru(key),
    }
}

fn en(key: &str) -> Option<&'static str> {
    let text = match key {
        "recent" => "Recent",
        "addNew" => "Add New",
        "emptyBasket" => "Your basket is empty",
        "submitNow" => "Submit Now",
        "chooseTime" => "Choose Time",
        "amount" => "Amount",
        "save" => "Save",
        "cancel" => "Cancel",
        "addFood" => "Add Food",
        "foodName" => "Food Name",
        "image" => "Image",
        "uploadImage" => "Upload Image",
        "searchImage" => "Search Image",
        "defaultAmount" => "Default Amount",
        "editFood" => "Edit Food",
        "deleteFood" => "Delete Food",
        "logMeal" => "Log Meal",
        "now" => "Now",
        "submit" => "Submit",
        "editMeal" => "Edit Meal",
        "deleteMeal" => "Delete Meal",
        "confirmDelete" => "Confirm Delete",
        "loggedMeals" => "Your Logged Meals",
        "loadMore" => "Load More",
        "loading" => "Loading...",
        "noMeals" => {
            "You haven't logged any meals yet. Add items to your basket and submit them to log a meal."
        }
        "mealLogged" => "Logged {count} items to your meal!",
        "confirmDeleteMeal" => "Are you sure you want to delete this meal?",
        "errorLoadingMeals" => "Failed to load submitted meals.",
        "errorSaving" => "Failed to save.",
        "errorDeleting" => "Failed to delete.",
        "localModeActive" => "Local Mode: Changes will not be saved to the cloud.",
        _ => return None,
    };
    Some(text)
}

fn ru(key: &str) -> Option<&'static str> {
    let text = match key {
        "recent" => "Недавнее",
        "addNew" => "Добавить",
        "emptyBasket" => "Ваша корзина пуста",
        "submitNow" => "Сохранить сейчас",
        "chooseTime" => "Выбрать время",
        "amount" => "Количество",
        "save" => "Сохранить",
        "cancel" => "Отмена",
        "addFood" => "Добавить продукт",
        "foodName" => "Название продукта",
        "image" => "Изображение",
        "uploadImage" => "Загрузить изображение",
        "searchImage" => "Поиск изображения",
        "defaultAmount" => "Количество по умолчанию",
        "editFood" => "Редактировать продукт",
        "deleteFood" => "Удалить продукт",
        "logMeal" => "Записать прием пищи",
        "now" => "Сейчас",
        "submit" => "Сохранить",
        "editMeal" => "Редактировать прием пищи",
        "deleteMeal" => "Удалить прием пищи",
        "confirmDelete" => "Подтвердить удаление",
        "loggedMeals" => "Ваши приемы пищи",
        "loadMore" => "Загрузить ещё",
        "loading" => "Загрузка...",
        "noMeals" => {
            "У вас еще нет записанных приемов пищи. Добавьте продукты в корзину и отправьте их, чтобы записать прием пищи."
        }
        "mealLogged" => "Записано {count} продуктов в ваш прием пищи!",
        "confirmDeleteMeal" => "Вы уверены, что хотите удалить этот прием пищи?",
        "errorLoadingMeals" => "Ошибка загрузки приемов пищи.",
        "errorSaving" => "Ошибка сохранения.",
        "errorDeleting" => "Ошибка удаления.",
        "localModeActive" => "Локальный режим: Изменения не будут сохранены в облаке.",
        _ => return None,
    };
    Some(text)
}
