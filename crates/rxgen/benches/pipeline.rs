//! Pipeline benchmarks.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rxgen::{generate, GeneratorConfig, SourceFile};

const SHOP: &str = r#"
#[model(scope = "singleton")]
pub struct Settings {
    #[observable]
    theme: String,
    #[observable]
    currency: String,
}

#[model(scope = "singleton")]
pub struct Customer {
    #[observable]
    name: String,
    #[observable]
    email: String,
    settings: Arc<Settings>,
}

#[model(scope = "scoped", implements = "OrderApi")]
pub struct Order {
    #[observable]
    #[trigger(on_status_changed)]
    status: String,
    #[observable(default = "0.0")]
    total: f64,
    #[observable(init)]
    lines: ObservableList<Line>,
    customer: Arc<Customer>,
    #[command(can_execute = "can_save")]
    save_command: Command,
}

impl Order {
    fn on_status_changed(&self) {}

    fn can_save(&self) -> bool {
        !self.customer.name().is_empty()
    }

    fn save(&self) {
        let total = self.total();
        self.set_total(total);
    }
}

#[component(observes = "status")]
pub struct OrderView {
    model: Arc<Order>,
}
"#;

fn generate_shop(c: &mut Criterion) {
    let sources = vec![SourceFile::new("src/shop.rs", "crate::shop", SHOP)];
    let config = GeneratorConfig::default();
    c.bench_function("generate_shop", |b| {
        b.iter(|| generate(black_box(&sources), &config))
    });
}

fn generate_many(c: &mut Criterion) {
    let sources: Vec<SourceFile> = (0..16)
        .map(|i| {
            let text = SHOP
                .replace("Settings", &format!("Settings{}", i))
                .replace("Customer", &format!("Customer{}", i))
                .replace("OrderView", &format!("View{}", i))
                .replace("Order", &format!("Order{}", i));
            SourceFile::new(format!("src/shop{}.rs", i), format!("crate::shop{}", i), text)
        })
        .collect();
    let config = GeneratorConfig::default();
    c.bench_function("generate_sixteen_files", |b| {
        b.iter(|| generate(black_box(&sources), &config))
    });
}

criterion_group!(benches, generate_shop, generate_many);
criterion_main!(benches);
