//! End-to-end payload flow: input mappings feed a worker's record schema,
//! the worker mutates its payload, and output mappings merge the result
//! back into the instance document.

use flowpack::{Int32Value, MappingDecl, Record, apply, compile, merge};

fn msgpack(v: &serde_json::Value) -> Vec<u8> {
    flowpack::codec::json::to_msgpack(v).unwrap()
}

fn json(buf: &[u8]) -> serde_json::Value {
    flowpack::codec::json::to_json(buf).unwrap()
}

#[test]
fn task_payload_flow_end_to_end() {
    let instance = msgpack(&serde_json::json!({
        "order": {"id": 7, "items": [{"sku": "a", "qty": 2}, {"sku": "b", "qty": 1}]},
        "audit": {"trace": "t-1"},
    }));

    let input = compile(&[
        MappingDecl::put("$.order.id", "$.orderId"),
        MappingDecl::collect("$.order.items[*].qty", "$.quantities"),
        MappingDecl::put("$.audit", "$.audit"),
    ])
    .unwrap();
    let task_input = apply(&input, &instance).unwrap();
    assert_eq!(
        json(&task_input),
        serde_json::json!({
            "orderId": 7,
            "quantities": [2, 1],
            "audit": {"trace": "t-1"},
        })
    );

    // the worker's schema declares what it understands; audit passes through
    let mut b = Record::builder();
    let order_id = b.int64("orderId");
    let quantities = b.array("quantities", Int32Value::new());
    let state = b.enumeration("state", &["CREATED", "COMPLETED"]);
    let mut task = b.build();
    task.wrap(&task_input).unwrap();

    assert_eq!(task.get_int64(order_id), 7);
    assert_eq!(task.get_enum(state), "CREATED");
    assert_eq!(task.undeclared().count(), 1);

    // double every quantity in place, then append a rush item
    {
        let mut cur = task.array_mut(quantities).cursor();
        while cur.has_next() {
            let qty = cur.next().unwrap();
            let doubled = qty.as_int32() * 2;
            qty.set_int32(doubled);
        }
    }
    task.array_mut(quantities).push(|e| e.set_int32(5));
    task.set_enum(state, "COMPLETED").unwrap();

    let task_output = task.to_bytes();
    assert_eq!(task_output.len(), task.encoded_len());

    let output = compile(&[
        MappingDecl::put("$.state", "$.order.state"),
        MappingDecl::put("$.quantities", "$.order.quantities"),
    ])
    .unwrap();
    let final_doc = merge(&output, &task_output, &instance).unwrap();
    assert_eq!(
        json(&final_doc),
        serde_json::json!({
            "order": {
                "id": 7,
                "items": [{"sku": "a", "qty": 2}, {"sku": "b", "qty": 1}],
                "state": "COMPLETED",
                "quantities": [4, 2, 5],
            },
            "audit": {"trace": "t-1"},
        })
    );
}

#[test]
fn unknown_fields_survive_the_whole_pipeline() {
    // a newer deployment added fields this worker's schema has never seen
    let payload = msgpack(&serde_json::json!({
        "known": 1,
        "novel": {"deep": [true, false]},
    }));

    let identity = compile(&[MappingDecl::put("$", "$")]).unwrap();
    let input = apply(&identity, &payload).unwrap();

    let mut b = Record::builder();
    let known = b.int32("known");
    let mut rec = b.build();
    rec.wrap(&input).unwrap();
    assert_eq!(rec.get_int32(known), 1);

    // decode/encode cycles neither shed nor duplicate the novel field
    let mut wire = rec.to_bytes();
    for _ in 0..3 {
        rec.wrap(&wire).unwrap();
        let next = rec.to_bytes();
        assert_eq!(next.len(), wire.len());
        wire = next;
    }
    assert_eq!(
        json(&wire),
        serde_json::json!({
            "known": 1,
            "novel": {"deep": [true, false]},
        })
    );
}
