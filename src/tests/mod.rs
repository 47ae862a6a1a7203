
#[cfg(test)]
pub mod test_util {
    use crate::{lang, CollectContext, Collector, ExtractOptions};

    /// Runs `query` through the handlers written in `handlers` and returns
    /// the collected context as JSON.
    pub fn collect(handlers: &str, query: &str) -> String {
        println!("Handlers: {}", handlers);
        println!("Query: {}", query);

        let collector = Collector::new(lang::parse_handlers::<CollectContext>(handlers).expect("handlers"));
        let mut context = CollectContext::default();
        collector
            .collect_document(&mut context, query, &ExtractOptions::default())
            .expect("collect");
        serde_json::to_string(&context).expect("serialized")
    }
}
