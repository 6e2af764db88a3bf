//! 逻辑字段 → 页面结构位置 的声明式映射。
//!
//! 页面改版时只需要改这里；提取逻辑对着 `tests/fixtures/` 中保存的页面测试。

/// HTML 页面中的 CSS 选择器
#[derive(Debug, Clone, Copy)]
pub struct HtmlLocators {
    /// 现价（sise 页）
    pub price: &'static str,
    /// 涨跌额文本，只含幅度
    pub change: &'static str,
    /// 含 "상승"/"하락"/"보합" 的方向容器
    pub direction: &'static str,
    /// 股票名称（main 页）
    pub stock_name: &'static str,
    /// 外国人数据行（frgn 页），带 onmouseover 的才是数据行
    pub flow_rows: &'static str,
    pub flow_cell: &'static str,
    /// 日期所在列
    pub flow_date_column: usize,
    /// 外国人净买入量所在列
    pub flow_net_buy_column: usize,
}

/// 实时接口 JSON 的键路径
#[derive(Debug, Clone, Copy)]
pub struct JsonLocators {
    pub areas: &'static [&'static str],
    pub area_name: &'static str,
    pub area_items: &'static str,
    pub index_area: &'static str,
    pub code: &'static str,
    pub value: &'static str,
    pub change: &'static str,
    pub change_rate: &'static str,
    pub direction: &'static str,
}

#[derive(Debug, Clone, Copy)]
pub struct Locators {
    pub html: HtmlLocators,
    pub json: JsonLocators,
}

pub const NAVER: Locators = Locators {
    html: HtmlLocators {
        price: "#_nowVal",
        change: "#_diff",
        direction: "p.no_exday",
        stock_name: "#middle > div.h_company > div.wrap_company > h2 > a",
        flow_rows: "div.inner_sub table.type2 tr[onmouseover]",
        flow_cell: "td",
        flow_date_column: 0,
        flow_net_buy_column: 6,
    },
    json: JsonLocators {
        areas: &["result", "areas"],
        area_name: "name",
        area_items: "datas",
        index_area: "SERVICE_INDEX",
        code: "cd",
        value: "nv",
        change: "cv",
        change_rate: "cr",
        direction: "rf",
    },
};

/// 指数接口中 nv / cv 以 ×100 的整数编码
pub const INDEX_FIXED_POINT: f64 = 100.0;
