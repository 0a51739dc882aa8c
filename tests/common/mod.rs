// Common test utilities
#![allow(dead_code)]

use refactor_miner::{Detection, Refactoring, RefactoringDetector, SourceSet};
use std::fs;
use tempfile::TempDir;

pub fn snapshot(files: &[(&str, &str)]) -> SourceSet {
    files
        .iter()
        .map(|(path, text)| (path.to_string(), text.to_string()))
        .collect()
}

/// Write a snapshot to a fresh temporary directory
pub fn write_snapshot(files: &[(&str, &str)]) -> TempDir {
    let temp_dir = TempDir::new().unwrap();
    for (path, text) in files {
        let full = temp_dir.path().join(path);
        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(full, text).unwrap();
    }
    temp_dir
}

pub fn detect(before: &[(&str, &str)], after: &[(&str, &str)]) -> Detection {
    RefactoringDetector::default().detect(&snapshot(before), &snapshot(after))
}

pub fn named<'a>(detection: &'a Detection, name: &str) -> Vec<&'a Refactoring> {
    detection
        .refactorings()
        .iter()
        .filter(|r| r.name() == name)
        .collect()
}

pub const CALCULATOR: &str = r#"
class Calculator:
    def __init__(self):
        self.memory = 0

    def sum(self, x, y):
        result = x + y
        self.memory = result
        return result

    def clear(self):
        self.memory = 0
"#;

pub const USER_BEFORE: &str = r#"
class Profile:
    def __init__(self, bio):
        self.bio = bio

    def describe(self):
        return self.bio


class User:
    def __init__(self, name, email):
        self.name = name
        self.email = email
        self.profile = Profile("")

    def contact(self):
        return self.name + " <" + self.email + ">"
"#;

pub const USER_AFTER: &str = r#"
class Profile:
    def __init__(self, bio, email):
        self.bio = bio
        self.email = email

    def describe(self):
        return self.bio


class User:
    def __init__(self, name, email):
        self.name = name
        self.profile = Profile("", email)

    def contact(self):
        return self.name + " <" + self.profile.email + ">"
"#;

pub const INVOICE_BEFORE: &str = r#"
class Invoice:
    def __init__(self, items):
        self.items = items

    def tax(self):
        tax_rate = 0.10
        return self.subtotal() * tax_rate

    def total(self):
        tax_rate = 0.10
        return self.subtotal() * (1 + tax_rate)

    def subtotal(self):
        return sum(self.items)
"#;

pub const INVOICE_AFTER: &str = r#"
class Invoice:
    def __init__(self, items):
        self.items = items
        self.tax_rate = 0.10

    def tax(self):
        return self.subtotal() * self.tax_rate

    def total(self):
        return self.subtotal() * (1 + self.tax_rate)

    def subtotal(self):
        return sum(self.items)
"#;

pub const REPORT_BEFORE: &str = r#"
class Report:
    def __init__(self, rows):
        self.rows = rows

    def render(self, title):
        header = title.upper()
        lines = [header]
        for row in self.rows:
            lines.append(str(row))
        return "\n".join(lines)
"#;

pub const REPORT_AFTER: &str = r#"
class Report:
    def __init__(self, rows):
        self.rows = rows

    def render(self, title):
        header = title.upper()
        lines = [header]
        self.append_rows(lines)
        return "\n".join(lines)

    def append_rows(self, lines):
        for row in self.rows:
            lines.append(str(row))
"#;

pub const ORDER_BEFORE: &str = r#"
class Order:
    def __init__(self, lines):
        self.lines = lines

    def total(self):
        return sum(self.lines)

    def describe(self, prefix, amount):
        text = prefix + ": " + str(amount)
        return text.upper()


class Formatter:
    def __init__(self, width):
        self.width = width
"#;

pub const ORDER_AFTER: &str = r#"
class Order:
    def __init__(self, lines):
        self.lines = lines

    def total(self):
        return sum(self.lines)


class Formatter:
    def __init__(self, width):
        self.width = width

    def describe(self, prefix, amount):
        text = prefix + ": " + str(amount)
        return text.upper()
"#;

pub const SHAPES_BEFORE: &str = r#"
class Shape:
    def __init__(self, name):
        self.name = name
        self.radius = 0


class Circle(Shape):
    def __init__(self, name):
        super().__init__(name)

    def label(self):
        return self.name.title()

    def area(self):
        return 3.14 * self.radius * self.radius
"#;

pub const SHAPES_AFTER: &str = r#"
class Shape:
    def __init__(self, name):
        self.name = name

    def label(self):
        return self.name.title()


class Circle(Shape):
    def __init__(self, name):
        super().__init__(name)
        self.radius = 0

    def area(self):
        return 3.14 * self.radius * self.radius
"#;

pub const REPOSITORY_BEFORE: &str = r#"
class Repository:
    def __init__(self, db):
        self.db = db

    @lru_cache(maxsize=32)
    def find(self, key):
        return self.db.get(key)

    @deprecated
    def find_all(self):
        return self.db.values()
"#;

pub const REPOSITORY_AFTER: &str = r#"
@register
class Repository:
    def __init__(self, db):
        self.db = db

    @lru_cache(maxsize=64)
    def find(self, key):
        return self.db.get(key)

    def find_all(self):
        return self.db.values()
"#;

pub const PRICING_BEFORE: &str = r#"
class Pricing:
    def total(self, price, qty):
        return price * qty + 5

    def net(self, price, qty):
        amount = price * qty
        return amount - 5
"#;

pub const PRICING_AFTER: &str = r#"
class Pricing:
    def total(self, price, qty):
        subtotal = price * qty
        return subtotal + 5

    def net(self, price, count):
        result = price * count
        return result - 5
"#;

pub const CLIENT_BEFORE: &str = r#"
class Client:
    def __init__(self):
        self.host = None
        self.port = None

    def configure(self, host, port):
        self.host = host
        self.port = port
"#;

pub const CLIENT_AFTER: &str = r#"
class Client:
    def __init__(self):
        self.host = None
        self.port = None

    def configure(self, endpoint):
        self.host = endpoint.host
        self.port = endpoint.port
"#;

pub const CANVAS_BEFORE: &str = r#"
class Canvas:
    def area(self, width):
        height = 10
        return width * height

    def resize(self, factor):
        return factor * 2

    def reset(self, value, force):
        return value
"#;

pub const CANVAS_AFTER: &str = r#"
class Canvas:
    def area(self, width, height=10):
        return width * height

    def resize(self, factor, anchor):
        return factor * 2

    def reset(self, value):
        return value
"#;
