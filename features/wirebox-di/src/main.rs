use std::sync::Arc;

use wirebox_di::{ContainerBuilder, DynError, ResolveContext, ServiceDescriptor};

fn main() {
    let app = ContainerBuilder::new()
        .add_instance("test".to_string())
        .add(
            ServiceDescriptor::singleton(|ctx: ResolveContext| async move {
                let a = ctx.resolve::<String>().await?;
                Ok::<_, DynError>(Test { a })
            })
            .eager()
            .depends_on("String")
            .build(),
        );

    let app = futures::executor::block_on(app.build_started()).unwrap();

    println!("{:?}", app);
    let t = futures::executor::block_on(app.resolve::<Test>()).unwrap();
    println!("{:?}", t);

    futures::executor::block_on(app.destroy()).unwrap();
}

#[derive(Debug)]
#[allow(dead_code)]
struct Test {
    a: Arc<String>,
}
